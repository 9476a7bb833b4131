use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid username or password")]
    AuthRejected,

    #[error("Session expired, please sign in again")]
    Unauthorized,

    #[error("{0}")]
    ValidationFailed(String),

    #[error("The requested item no longer exists, refresh and try again")]
    NotFound,

    #[error("Server unreachable: {0}")]
    Unreachable(String),

    #[error("Access forbidden")]
    Forbidden,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    #[error("Credential store error: {0}")]
    CredentialStore(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::ValidationFailed(message.into())
    }

    /// True when the shell should route the user back to the sign-in view.
    pub fn forces_sign_in(&self) -> bool {
        matches!(self, AppError::Unauthorized)
    }

    /// Maps a non-success status and its extracted detail onto the taxonomy.
    /// 401 is classified here but the forced logout is the gateway's job.
    pub fn from_status(status: StatusCode, detail: Option<String>) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => AppError::Unauthorized,
            StatusCode::NOT_FOUND => AppError::NotFound,
            StatusCode::FORBIDDEN => AppError::Forbidden,
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                AppError::ValidationFailed(
                    detail.unwrap_or_else(|| format!("Request rejected ({})", status.as_u16())),
                )
            }
            _ => AppError::Server {
                status: status.as_u16(),
                message: detail.unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                }),
            },
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::InvalidResponse(err.to_string())
        } else if err.is_builder() {
            AppError::Internal(anyhow::anyhow!("Failed to build request: {}", err))
        } else {
            AppError::Unreachable(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidResponse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
