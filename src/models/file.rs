use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub type FileId = u64;

/// One stored file as listed in a user's collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(alias = "id_storage", alias = "id_file")]
    pub id: FileId,
    #[serde(rename = "name", alias = "original_name")]
    pub display_name: String,
    #[serde(default)]
    pub comment: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    #[serde(rename = "uploadDate", alias = "upload_date")]
    pub uploaded_at: DateTime<Utc>,
    #[serde(
        default,
        rename = "lastDownloadDate",
        alias = "last_download_date"
    )]
    pub last_downloaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct RenameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct ShareLinkResponse {
    pub file_link: String,
}

/// Result of a completed download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}
