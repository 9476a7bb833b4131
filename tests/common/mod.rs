#![allow(dead_code)]

use std::sync::Arc;

use my_cloud_client::{
    auth::{CredentialStore, MemoryCredentialStore, ROLE_KEY, TOKEN_KEY, USER_ID_KEY},
    config::Config,
    Client,
};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const TOKEN: &str = "test-token";

pub fn config_for(server: &MockServer) -> Config {
    Config::for_base_url(&format!("{}/api", server.uri()))
}

pub fn guest_client(server: &MockServer) -> (Client, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    let client = Client::with_store(config_for(server), store.clone()).unwrap();
    (client, store)
}

/// A client whose store already holds a credential, as after a restart.
pub fn signed_in_client(
    server: &MockServer,
    role: &str,
    user_id: u64,
) -> (Client, Arc<MemoryCredentialStore>) {
    let store = Arc::new(MemoryCredentialStore::new());
    store.set(TOKEN_KEY, TOKEN).unwrap();
    store.set(ROLE_KEY, role).unwrap();
    store.set(USER_ID_KEY, &user_id.to_string()).unwrap();

    let client = Client::with_store(config_for(server), store.clone()).unwrap();
    (client, store)
}

pub fn file_json(id: u64, name: &str, size: u64) -> Value {
    json!({
        "id": id,
        "name": name,
        "comment": "",
        "size": size,
        "uploadDate": "2024-05-01T10:00:00Z",
        "lastDownloadDate": null
    })
}

pub fn user_json(id: u64, username: &str, role: &str) -> Value {
    json!({
        "id": id,
        "email": format!("{}@example.com", username),
        "username": username,
        "fullName": username.to_uppercase(),
        "role": role,
        "storages": []
    })
}
