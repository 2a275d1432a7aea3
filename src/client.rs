//! HTTP client adapter for the GitHub REST API
//!
//! [`ApiClient`] wraps two `reqwest` clients: one for JSON calls, which follows
//! redirects normally, and one for archive downloads, which never follows them
//! on its own. Archive requests are redirected to a storage host that rejects
//! requests carrying GitHub credentials, so [`ApiClient::download`] sends the
//! authorization headers on the first hop only and follows the redirect
//! chain itself.
//!
//! Every failure is logged once, at error level, and returned as a typed
//! [`Error`]. Nothing is retried.

use crate::error::{Error, Result};
use futures::StreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderName, HeaderValue, LOCATION};
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Timeout for JSON API calls
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Connect timeout for archive downloads (the transfer itself is unbounded)
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of redirects followed for one archive download
const MAX_REDIRECTS: usize = 10;

/// Media type GitHub recommends for REST calls
pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// REST API version pinned on every request
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Build the header set sent with every request of one account
///
/// The authorization value is marked sensitive so it never shows up in
/// `Debug` output, including the request logs written by this module.
pub fn github_headers(token: &str) -> Result<HeaderMap> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| Error::config("token", "token contains characters not allowed in a header"))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
    headers.insert(
        HeaderName::from_static("x-github-api-version"),
        HeaderValue::from_static(GITHUB_API_VERSION),
    );
    Ok(headers)
}

/// Shared HTTP client used by every account session
///
/// Cloning is cheap; clones share connection pools.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    archive: reqwest::Client,
}

impl ApiClient {
    /// Create a client with the crate's user agent and timeouts
    pub fn new() -> Result<Self> {
        let user_agent = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        let archive = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to create HTTP client: {}", e),
                key: None,
            })?;

        Ok(Self { http, archive })
    }

    /// `GET url?query`, decoding a JSON response
    pub async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        headers: &HeaderMap,
    ) -> Result<T> {
        self.request::<T, ()>(Method::GET, url, query, headers, None)
            .await
    }

    /// `POST url` with a JSON body, decoding a JSON response
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: &B,
    ) -> Result<T> {
        self.request(Method::POST, url, &[], headers, Some(body))
            .await
    }

    /// Issue one API request
    ///
    /// Query parameters are URL-encoded onto `url` when present. A body is
    /// serialized as JSON and sent with `Content-Type: application/json` in
    /// addition to `headers`.
    pub async fn request<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: &str,
        query: &[(&str, String)],
        headers: &HeaderMap,
        body: Option<&B>,
    ) -> Result<T> {
        let mut request = self
            .http
            .request(method.clone(), url)
            .headers(headers.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(source) => {
                tracing::error!(
                    %method,
                    url,
                    ?query,
                    ?headers,
                    error = %source,
                    "GitHub API request failed"
                );
                return Err(Error::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                %method,
                url,
                ?query,
                ?headers,
                status = status.as_u16(),
                body = %body,
                "GitHub API returned an error"
            );
            return Err(Error::Api {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        response.json::<T>().await.map_err(|source| {
            tracing::error!(%method, url, ?query, error = %source, "Failed to decode GitHub API response");
            Error::Decode {
                url: url.to_string(),
                source,
            }
        })
    }

    /// Stream the resource at `url` into `destination`
    ///
    /// `headers` go out on the first request only; redirect targets are
    /// requested without them. The body is written to `<destination>.part`
    /// and renamed over `destination` when complete; the partial file is
    /// removed when the transfer fails or the future is dropped. Returns the
    /// number of bytes written.
    pub async fn download(&self, url: &str, headers: &HeaderMap, destination: &Path) -> Result<u64> {
        let fail = |reason: String| {
            tracing::error!(url, ?headers, path = %destination.display(), error = %reason, "Archive download failed");
            Error::Download {
                path: destination.to_path_buf(),
                reason,
            }
        };

        let mut response = self
            .archive
            .get(url)
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| fail(format!("request failed: {}", e)))?;

        let mut hops = 0;
        while response.status().is_redirection() {
            hops += 1;
            if hops > MAX_REDIRECTS {
                return Err(fail(format!("more than {} redirects", MAX_REDIRECTS)));
            }
            let target = redirect_target(&response).ok_or_else(|| {
                fail(format!(
                    "HTTP {} without a usable Location header",
                    response.status().as_u16()
                ))
            })?;
            tracing::debug!(
                hop = hops,
                host = target.host_str().unwrap_or_default(),
                "Following archive redirect without credentials"
            );
            response = self
                .archive
                .get(target)
                .send()
                .await
                .map_err(|e| fail(format!("redirected request failed: {}", e)))?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(fail(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        // Dropping the guard (failure or cancellation) removes the partial file
        let partial = PartialFile::beside(destination);
        let bytes = stream_to_file(response, &partial.path)
            .await
            .map_err(fail)?;
        tokio::fs::rename(&partial.path, destination)
            .await
            .map_err(|e| fail(format!("failed to move archive into place: {}", e)))?;
        Ok(bytes)
    }
}

/// `<destination>.part`, removed on drop if it still exists
///
/// Archives are streamed into this file and renamed over the destination
/// once complete, so an interrupted download never touches an existing
/// archive at the final path.
struct PartialFile {
    path: PathBuf,
}

impl PartialFile {
    fn beside(destination: &Path) -> Self {
        let mut name = destination.as_os_str().to_owned();
        name.push(".part");
        Self {
            path: PathBuf::from(name),
        }
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Removed partial archive");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial archive");
            }
        }
    }
}

/// Resolve the `Location` of a redirect response against its URL
fn redirect_target(response: &reqwest::Response) -> Option<Url> {
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    response.url().join(location).ok()
}

async fn stream_to_file(
    response: reqwest::Response,
    destination: &Path,
) -> std::result::Result<u64, String> {
    let mut file = tokio::fs::File::create(destination)
        .await
        .map_err(|e| format!("failed to create file: {}", e))?;

    let mut written = 0u64;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| format!("transfer interrupted: {}", e))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| format!("write failed: {}", e))?;
        written += chunk.len() as u64;
    }
    file.flush()
        .await
        .map_err(|e| format!("write failed: {}", e))?;

    Ok(written)
}
