use serde::{Deserialize, Serialize};

use super::session::{AccountRole, UserId};

/// A registered account as shown in the admin directory.
///
/// `storage_usage_bytes` and `file_count` are derived from the account's
/// stored files during decoding; the server never supplies them directly.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "UserPayload")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub full_name: String,
    pub role: AccountRole,
    pub file_count: usize,
    pub storage_usage_bytes: u64,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    #[serde(alias = "id_user")]
    id: UserId,
    #[serde(default)]
    email: String,
    username: String,
    #[serde(default, rename = "fullName", alias = "fullname", alias = "full_name")]
    full_name: String,
    role: AccountRole,
    #[serde(default, alias = "storageFiles")]
    storages: Vec<StoredFileSize>,
}

#[derive(Debug, Deserialize)]
struct StoredFileSize {
    #[serde(default)]
    size: u64,
}

impl From<UserPayload> for UserRecord {
    fn from(payload: UserPayload) -> Self {
        Self {
            id: payload.id,
            email: payload.email,
            username: payload.username,
            full_name: payload.full_name,
            role: payload.role,
            file_count: payload.storages.len(),
            storage_usage_bytes: payload.storages.iter().map(|file| file.size).sum(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoleChangeRequest {
    pub role: AccountRole,
}

/// Body of a role change reply. The server echoes the whole account; only
/// the role is read back.
#[derive(Debug, Deserialize)]
pub struct RoleChangeResponse {
    pub role: AccountRole,
}
