//! Output path templates
//!
//! `outfile` is a format string with three placeholders:
//!
//! - `{username}`: account login returned when the migration was created
//! - `{id}`: migration id
//! - `{datetime}`: time the migration was last updated, optionally with a
//!   strftime spec: `{datetime:%Y-%m-%d}`
//!
//! `{{` and `}}` produce literal braces. Without a spec, `{datetime}` renders
//! as `2024-01-01 00:00:00+00:00`, with microseconds when they are non-zero.

use crate::error::{Error, Result};
use crate::types::MigrationId;
use chrono::{DateTime, FixedOffset, Timelike};
use std::fmt::Write;
use std::path::PathBuf;

/// Values substituted into an output template
#[derive(Clone, Debug)]
pub struct TemplateValues<'a> {
    /// Account login
    pub username: &'a str,
    /// Last update of the exported migration
    pub datetime: DateTime<FixedOffset>,
    /// Migration id
    pub id: MigrationId,
}

/// Parse the `updated_at` timestamp of a migration
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw).ok()
}

/// Render `template` into a destination path
pub fn render(template: &str, values: &TemplateValues<'_>) -> Result<PathBuf> {
    let invalid = |reason: String| Error::Template {
        template: template.to_string(),
        reason,
    };

    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '}' => return Err(invalid("single '}' encountered".to_string())),
            '{' => {
                let mut field = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    field.push(c);
                }
                if !closed {
                    return Err(invalid("unclosed '{'".to_string()));
                }
                let (name, spec) = match field.split_once(':') {
                    Some((name, spec)) => (name, Some(spec)),
                    None => (field.as_str(), None),
                };
                substitute(&mut out, name, spec, values).map_err(invalid)?;
            }
            c => out.push(c),
        }
    }

    if out.is_empty() {
        return Err(invalid("renders to an empty path".to_string()));
    }
    Ok(PathBuf::from(out))
}

fn substitute(
    out: &mut String,
    name: &str,
    spec: Option<&str>,
    values: &TemplateValues<'_>,
) -> std::result::Result<(), String> {
    match (name, spec) {
        ("username", None) => out.push_str(values.username),
        ("id", None) => out.push_str(&values.id.to_string()),
        ("datetime", None) => out.push_str(&default_datetime(&values.datetime)),
        ("datetime", Some(spec)) => write!(out, "{}", values.datetime.format(spec))
            .map_err(|_| format!("invalid strftime spec {:?}", spec))?,
        ("username" | "id", Some(spec)) => {
            return Err(format!("format spec {:?} is not supported for {{{}}}", spec, name));
        }
        (name, _) => return Err(format!("unknown placeholder {{{}}}", name)),
    }
    Ok(())
}

fn default_datetime(dt: &DateTime<FixedOffset>) -> String {
    if dt.nanosecond() / 1_000 == 0 {
        dt.format("%Y-%m-%d %H:%M:%S%:z").to_string()
    } else {
        dt.format("%Y-%m-%d %H:%M:%S%.6f%:z").to_string()
    }
}
