use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_base_url: String,
    pub credentials_path: PathBuf,
    pub download_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub error_display_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000/api".to_string())
                .trim_end_matches('/')
                .to_string(),
            credentials_path: env::var("CREDENTIALS_PATH")
                .unwrap_or_else(|_| ".my_cloud/session.json".to_string())
                .into(),
            download_dir: env::var("DOWNLOAD_DIR")
                .unwrap_or_else(|_| "./downloads".to_string())
                .into(),
            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            error_display_secs: env::var("ERROR_DISPLAY_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()?,
        })
    }

    /// Configuration pointing at `base_url` with default timings; used by
    /// embedders that do not read the environment.
    pub fn for_base_url(base_url: &str) -> Self {
        Config {
            api_base_url: base_url.trim_end_matches('/').to_string(),
            credentials_path: ".my_cloud/session.json".into(),
            download_dir: "./downloads".into(),
            request_timeout_secs: 30,
            error_display_secs: 3,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn error_display_window(&self) -> Duration {
        Duration::from_secs(self.error_display_secs)
    }
}
