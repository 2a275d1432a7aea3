use super::*;
use crate::config::AccountOptions;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod lifecycle;

/// Options pointing at `server` with a fast poll interval
fn options(server: &MockServer) -> AccountOptions {
    AccountOptions {
        token: Some("t1".into()),
        check_time: Some(0.01),
        api_url: Some(server.uri()),
        ..Default::default()
    }
}

fn resolve(options: &AccountOptions) -> AccountConfig {
    AccountConfig::resolve(&AccountOptions::default(), options).unwrap()
}

fn repo(full_name: &str) -> Value {
    json!({ "full_name": full_name, "fork": false, "disabled": false })
}

async fn mount_repos(server: &MockServer, repos: Vec<Value>) {
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(repos))
        .mount(server)
        .await;
}

async fn mount_create(server: &MockServer, id: u64, login: &str) {
    Mock::given(method("POST"))
        .and(path("/user/migrations"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": id, "owner": { "login": login } })),
        )
        .mount(server)
        .await;
}

/// Respond to the next `times` status polls with `state`
async fn mount_state(server: &MockServer, id: u64, state: &str, times: u64) {
    Mock::given(method("GET"))
        .and(path(format!("/user/migrations/{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "state": state,
            "updated_at": "2024-01-01T00:00:00.000000+00:00",
        })))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Requests received by `server` for `method` and `path`
async fn requests_to(server: &MockServer, method: &str, path: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == method && r.url.path() == path)
        .collect()
}

/// Start a session for the usual `a/r1`, `a/r2` account with migration 5
async fn started(server: &MockServer, options: &AccountOptions) -> AccountSession {
    mount_repos(server, vec![repo("a/r1"), repo("a/r2")]).await;
    mount_create(server, 5, "a").await;
    AccountSession::start(ApiClient::new().unwrap(), resolve(options))
        .await
        .unwrap()
}
