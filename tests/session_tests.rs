mod common;

use std::sync::Arc;

use my_cloud_client::{
    auth::{CredentialStore, FileCredentialStore, RedirectTarget, ROLE_KEY, TOKEN_KEY},
    config::Config,
    errors::AppError,
    models::{AccountRole, RegisterRequest, Role, SessionPhase},
    Client,
};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{config_for, guest_client, signed_in_client, TOKEN};

async fn mock_login(server: &MockServer, token: &str, role: &str, user_id: u64) {
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": token,
            "role": role,
            "userId": user_id
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_login_then_logout_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .and(body_json(json!({"username": "alice", "password": "Secret1!"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "abc",
            "role": "admin",
            "userId": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .and(header("Authorization", "Bearer abc"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = guest_client(&server);
    assert_eq!(client.session.phase(), SessionPhase::Guest);

    let outcome = client.session.login("alice", "Secret1!").await.unwrap();
    assert_eq!(outcome.role, AccountRole::Admin);
    assert_eq!(outcome.user_id, Some(1));
    assert_eq!(outcome.landing, RedirectTarget::AdminDirectory);

    let session = client.session.snapshot();
    assert_eq!(session.token(), Some("abc"));
    assert_eq!(session.role(), Role::Admin);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc"));
    assert_eq!(store.get(ROLE_KEY).unwrap().as_deref(), Some("admin"));

    client.session.logout().await;
    assert_eq!(client.session.phase(), SessionPhase::Guest);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_rejected_credentials_leave_guest() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"non_field_errors": ["Unable to log in."]})),
        )
        .mount(&server)
        .await;

    let (client, store) = guest_client(&server);
    let err = client.session.login("alice", "wrong").await.unwrap_err();

    assert!(matches!(err, AppError::AuthRejected));
    assert!(!client.session.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_failed_relogin_drops_previous_identity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/login"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let (client, store) = signed_in_client(&server, "user", 7);
    assert!(client.session.is_authenticated());

    let err = client.session.login("bob", "nope").await.unwrap_err();
    assert!(matches!(err, AppError::AuthRejected));
    assert_eq!(client.session.phase(), SessionPhase::Guest);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_unreachable_server_is_not_reported_as_bad_credentials() {
    // Nothing listens on a port freed right after binding it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let config = Config::for_base_url(&format!("http://127.0.0.1:{}/api", port));

    let client = Client::with_store(
        config,
        Arc::new(my_cloud_client::auth::MemoryCredentialStore::new()),
    )
    .unwrap();
    let err = client.session.login("alice", "Secret1!").await.unwrap_err();

    assert!(matches!(err, AppError::Unreachable(_)));
    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn test_logout_ends_as_guest_even_when_server_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = signed_in_client(&server, "user", 7);
    client.session.logout().await;

    assert!(!client.session.is_authenticated());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_unauthorized_response_forces_sign_in() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/storage/7"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Invalid token."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = signed_in_client(&server, "user", 7);
    let storage = client.file_collection();
    let err = storage.load(7).await.unwrap_err();

    assert!(matches!(err, AppError::Unauthorized));
    assert!(err.forces_sign_in());
    assert_eq!(client.session.phase(), SessionPhase::Guest);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}

#[tokio::test]
async fn test_stale_rejection_keeps_newer_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/storage/7"))
        .respond_with(
            ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mock_login(&server, "fresh", "user", 7).await;

    let (client, _store) = signed_in_client(&server, "user", 7);
    let storage = client.file_collection();

    let (load, login) = tokio::join!(storage.load(7), async {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        client.session.login("alice", "Secret1!").await
    });

    assert!(matches!(load, Err(AppError::Unauthorized)));
    login.unwrap();
    assert_eq!(client.session.snapshot().token(), Some("fresh"));
}

#[tokio::test]
async fn test_session_survives_restart() {
    let server = MockServer::start().await;
    mock_login(&server, "persisted", "admin", 3).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = config_for(&server);
    config.credentials_path = dir.path().join("session.json");

    let first = Client::open(config.clone()).unwrap();
    first.session.login("alice", "Secret1!").await.unwrap();
    drop(first);

    let second = Client::open(config.clone()).unwrap();
    let session = second.session.snapshot();
    assert_eq!(session.token(), Some("persisted"));
    assert_eq!(session.role(), Role::Admin);
    assert_eq!(session.user_id(), Some(3));

    let store = FileCredentialStore::open(&config.credentials_path).unwrap();
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("persisted"));
}

#[tokio::test]
async fn test_invalid_registration_is_not_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = guest_client(&server);
    let mut request = RegisterRequest {
        username: "1bad".to_string(),
        full_name: "Alice Smith".to_string(),
        email: "alice@example.com".to_string(),
        password: "Secret1!".to_string(),
    };

    let err = client.session.register(&request).await.unwrap_err();
    assert!(matches!(err, AppError::ValidationFailed(_)));

    request.username = "alice".to_string();
    client.session.register(&request).await.unwrap();
    assert!(!client.session.is_authenticated());
}

#[tokio::test]
async fn test_registration_conflict_carries_server_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/register"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_json(json!({"username": ["A user with that username already exists."]})),
        )
        .mount(&server)
        .await;

    let (client, _store) = guest_client(&server);
    let request = RegisterRequest {
        username: "alice".to_string(),
        full_name: "Alice Smith".to_string(),
        email: "alice@example.com".to_string(),
        password: "Secret1!".to_string(),
    };

    match client.session.register(&request).await {
        Err(AppError::ValidationFailed(detail)) => {
            assert_eq!(detail, "username: A user with that username already exists.")
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}
