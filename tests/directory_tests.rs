mod common;

use my_cloud_client::{
    auth::{decide, Capability, CredentialStore, Decision, RedirectTarget, TOKEN_KEY},
    errors::AppError,
    models::{AccountRole, SessionPhase, UserRecord},
};
use serde_json::json;
use wiremock::{
    matchers::{body_json, method, path},
    Mock, MockServer, ResponseTemplate,
};

use common::{guest_client, signed_in_client, user_json};

fn names(users: &[UserRecord]) -> Vec<&str> {
    users.iter().map(|u| u.username.as_str()).collect()
}

#[tokio::test]
async fn test_directory_lists_admins_first() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_json(2, "bob", "user"),
            user_json(1, "alice", "admin"),
            user_json(3, "zoe", "user")
        ])))
        .mount(&server)
        .await;

    let (client, _store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();
    directory.load().await.unwrap();

    let users = directory.users();
    assert_eq!(names(&users), ["alice", "bob", "zoe"]);
}

#[tokio::test]
async fn test_usage_is_derived_from_stored_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 4,
            "email": "ann@example.com",
            "username": "ann",
            "fullName": "Ann Smith",
            "role": "user",
            "storages": [{"size": 1024}, {"size": 512}]
        }])))
        .mount(&server)
        .await;

    let (client, _store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();
    directory.load().await.unwrap();

    let users = directory.users();
    assert_eq!(users[0].file_count, 2);
    assert_eq!(users[0].storage_usage_bytes, 1536);
}

#[tokio::test]
async fn test_remove_drops_only_that_account() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_json(1, "alice", "admin"),
            user_json(2, "bob", "user"),
            user_json(3, "zoe", "user")
        ])))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/users/2"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();
    directory.load().await.unwrap();
    directory.remove(2).await.unwrap();

    assert_eq!(names(&directory.users()), ["alice", "zoe"]);
}

#[tokio::test]
async fn test_role_change_reloads_directory() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_json(1, "alice", "admin"),
            user_json(2, "bob", "user")
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/api/users/2"))
        .and(body_json(json!({"role": "admin"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json(2, "bob", "admin")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            user_json(2, "bob", "admin"),
            user_json(1, "alice", "admin")
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (client, _store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();
    directory.load().await.unwrap();
    directory.change_role(2, AccountRole::Admin).await.unwrap();

    let users = directory.users();
    assert_eq!(names(&users), ["alice", "bob"]);
    assert!(users.iter().all(|u| u.role == AccountRole::Admin));
}

#[tokio::test]
async fn test_forbidden_directory_keeps_previous_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let (client, _store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();

    let err = directory.load().await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden));
    assert!(directory.users().is_empty());
    assert!(directory.error().is_some());
    assert!(client.session.is_authenticated());
}

#[tokio::test]
async fn test_guard_routes_by_role() {
    let server = MockServer::start().await;

    let (guest, _) = guest_client(&server);
    assert_eq!(
        decide(&guest.session.snapshot(), Capability::AdminDirectory),
        Decision::RedirectTo(RedirectTarget::SignIn)
    );

    let (user, _) = signed_in_client(&server, "user", 7);
    let session = user.session.snapshot();
    assert_eq!(
        decide(&session, Capability::storage_of(&session, 7)),
        Decision::Allow
    );
    assert_eq!(
        decide(&session, Capability::storage_of(&session, 8)),
        Decision::RedirectTo(RedirectTarget::OwnStorage)
    );

    let (admin, _) = signed_in_client(&server, "admin", 1);
    let session = admin.session.snapshot();
    assert_eq!(
        decide(&session, Capability::storage_of(&session, 7)),
        Decision::Allow
    );
}

#[tokio::test]
async fn test_unauthorized_directory_load_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let (client, store) = signed_in_client(&server, "admin", 1);
    let directory = client.user_directory();

    let err = directory.load().await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized));
    assert_eq!(client.session.phase(), SessionPhase::Guest);
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
    assert!(directory.users().is_empty());
}
