use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type UserId = u64;

/// Role of a registered account as the remote authority reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountRole {
    User,
    Admin,
}

impl AccountRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountRole::User => "user",
            AccountRole::Admin => "admin",
        }
    }
}

impl fmt::Display for AccountRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(AccountRole::User),
            "admin" => Ok(AccountRole::Admin),
            other => Err(format!("Unknown role '{}', expected 'user' or 'admin'", other)),
        }
    }
}

/// Privilege of whoever drives the client, including nobody.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl From<AccountRole> for Role {
    fn from(role: AccountRole) -> Self {
        match role {
            AccountRole::User => Role::User,
            AccountRole::Admin => Role::Admin,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Guest,
    Authenticating,
    Authenticated,
}

/// The client's belief about who is signed in.
///
/// Fields are private: the only constructors keep `token == None` tied to
/// `role == Guest` and `user_id == None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
    role: Role,
    user_id: Option<UserId>,
}

impl Session {
    pub fn guest() -> Self {
        Self {
            token: None,
            role: Role::Guest,
            user_id: None,
        }
    }

    pub fn authenticated(token: String, role: AccountRole, user_id: Option<UserId>) -> Self {
        Self {
            token: Some(token),
            role: role.into(),
            user_id,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::guest()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: AccountRole,
    #[serde(default, rename = "userId", alias = "user_id", alias = "id_user")]
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    pub email: String,
    pub password: String,
}
