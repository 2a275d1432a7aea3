use super::*;
use crate::config::{Affiliation, RepoFilter, RepoList, Visibility};
use crate::error::Error;
use wiremock::matchers::{body_json, header};

#[tokio::test]
async fn test_start_creates_migration_for_listed_repositories() {
    let server = MockServer::start().await;
    mount_repos(&server, vec![repo("a/r2"), repo("a/r1")]).await;
    Mock::given(method("POST"))
        .and(path("/user/migrations"))
        .and(header("authorization", "Bearer t1"))
        .and(body_json(json!({
            "repositories": ["a/r1", "a/r2"],
            "lock_repositories": false,
            "exclude_metadata": false,
            "exclude_git_data": false,
            "exclude_attachments": false,
            "exclude_releases": false,
            "exclude_owner_projects": false,
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": 5, "owner": { "login": "a" } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options(&server)))
        .await
        .unwrap();

    assert_eq!(session.id(), MigrationId(5));
    assert_eq!(session.login(), "a");
    assert_eq!(
        session.repositories().iter().collect::<Vec<_>>(),
        vec!["a/r1", "a/r2"]
    );
}

#[tokio::test]
async fn test_listing_sends_account_filters_and_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("affiliation", "owner,collaborator,organization_member"))
        .and(query_param("visibility", "private"))
        .and(query_param("per_page", "100"))
        .and(query_param("page", "1"))
        .and(header("authorization", "Bearer t1"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![repo("a/secret")]))
        .expect(1)
        .mount(&server)
        .await;
    mount_create(&server, 1, "a").await;

    let mut options = options(&server);
    options.affiliation = Some(Affiliation::All);
    options.visibility = Some(Visibility::Private);
    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();

    assert!(session.repositories().contains("a/secret"));
}

#[tokio::test]
async fn test_excluded_repositories_never_reach_the_migration() {
    let server = MockServer::start().await;
    mount_repos(
        &server,
        vec![
            repo("a/Keep"),
            repo("A/Skip"),
            repo("a/other"),
            json!({ "full_name": "a/forked", "fork": true, "disabled": false }),
            json!({ "full_name": "a/frozen", "fork": false, "disabled": true }),
        ],
    )
    .await;
    mount_create(&server, 2, "a").await;

    let mut options = options(&server);
    options.exclude_repos = Some(RepoList::Many(vec!["a/skip".into(), "A/OTHER".into()]));
    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();

    // Forks are left out by default, disabled repositories kept
    assert_eq!(
        session.repositories().iter().collect::<Vec<_>>(),
        vec!["a/Keep", "a/frozen"]
    );

    let created = requests_to(&server, "POST", "/user/migrations").await;
    let body: Value = serde_json::from_slice(&created[0].body).unwrap();
    assert_eq!(body["repositories"], json!(["a/Keep", "a/frozen"]));
}

#[tokio::test]
async fn test_fork_and_disabled_filters() {
    let server = MockServer::start().await;
    mount_repos(
        &server,
        vec![
            repo("a/plain"),
            json!({ "full_name": "a/forked", "fork": true, "disabled": false }),
            json!({ "full_name": "a/frozen", "fork": false, "disabled": true }),
        ],
    )
    .await;
    mount_create(&server, 3, "a").await;

    let mut options = options(&server);
    options.forks = Some(RepoFilter::Only);
    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();
    assert_eq!(
        session.repositories().iter().collect::<Vec<_>>(),
        vec!["a/forked"]
    );

    let mut options = super::options(&server);
    options.forks = Some(RepoFilter::Include);
    options.disabled_repos = Some(RepoFilter::Exclude);
    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();
    assert_eq!(
        session.repositories().iter().collect::<Vec<_>>(),
        vec!["a/forked", "a/plain"]
    );
}

#[tokio::test]
async fn test_listing_follows_pages_until_a_short_page() {
    let server = MockServer::start().await;
    let first: Vec<Value> = (0..100).map(|i| repo(&format!("a/r{:03}", i))).collect();
    mount_repos(&server, first).await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![repo("a/last")]))
        .expect(1)
        .mount(&server)
        .await;
    mount_create(&server, 4, "a").await;

    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options(&server)))
        .await
        .unwrap();

    assert_eq!(session.repositories().len(), 101);
    assert!(session.repositories().contains("a/last"));
    assert_eq!(requests_to(&server, "GET", "/user/repos").await.len(), 2);
}

#[tokio::test]
async fn test_org_metadata_only_skips_listing() {
    let server = MockServer::start().await;
    mount_repos(&server, vec![repo("a/r1")]).await;
    mount_create(&server, 6, "a").await;

    let mut options = options(&server);
    options.org_metadata_only = Some(true);
    let session = AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();

    assert!(session.repositories().is_empty());
    assert!(requests_to(&server, "GET", "/user/repos").await.is_empty());

    let created = requests_to(&server, "POST", "/user/migrations").await;
    let body: Value = serde_json::from_slice(&created[0].body).unwrap();
    assert_eq!(body["org_metadata_only"], json!(true));
    assert_eq!(body["repositories"], json!([]));
}

#[tokio::test]
async fn test_exclude_flags_are_sent_as_configured() {
    let server = MockServer::start().await;
    mount_repos(&server, vec![repo("a/r1")]).await;
    mount_create(&server, 7, "a").await;

    let mut options = options(&server);
    options.lock_repositories = Some(true);
    options.exclude_attachments = Some(true);
    options.exclude_owner_projects = Some(true);
    AccountSession::start(ApiClient::new().unwrap(), resolve(&options))
        .await
        .unwrap();

    let created = requests_to(&server, "POST", "/user/migrations").await;
    let body: Value = serde_json::from_slice(&created[0].body).unwrap();
    assert_eq!(body["lock_repositories"], json!(true));
    assert_eq!(body["exclude_attachments"], json!(true));
    // Releases follow their own setting, not the attachments one
    assert_eq!(body["exclude_releases"], json!(false));
    assert_eq!(body["exclude_owner_projects"], json!(true));
    assert!(body.get("org_metadata_only").is_none());
}

#[tokio::test]
async fn test_listing_failure_fails_the_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
        .mount(&server)
        .await;
    mount_create(&server, 8, "a").await;

    let err = AccountSession::start(ApiClient::new().unwrap(), resolve(&options(&server)))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Api { status: 401, .. }));
    assert!(requests_to(&server, "POST", "/user/migrations").await.is_empty());
}

#[tokio::test]
async fn test_creation_failure_fails_the_account() {
    let server = MockServer::start().await;
    mount_repos(&server, vec![repo("a/r1")]).await;
    Mock::given(method("POST"))
        .and(path("/user/migrations"))
        .respond_with(ResponseTemplate::new(422).set_body_string("Validation Failed"))
        .mount(&server)
        .await;

    let err = AccountSession::start(ApiClient::new().unwrap(), resolve(&options(&server)))
        .await
        .unwrap_err();

    match err {
        Error::Api { status, body, .. } => {
            assert_eq!(status, 422);
            assert_eq!(body, "Validation Failed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
