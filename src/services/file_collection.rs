use futures::{Stream, StreamExt};
use parking_lot::RwLock;
use reqwest::{
    header::CONTENT_DISPOSITION,
    multipart::{Form, Part},
    Body,
};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::{
    config::Config,
    errors::{AppError, Result},
    models::{DownloadedFile, FileId, FileRecord, RenameRequest, ShareLinkResponse, UserId},
    services::{feedback::ViewFeedback, gateway::ResourceGateway},
    utils::file::{fallback_file_name, filename_from_content_disposition, sanitize_file_name},
};

enum UploadSource {
    Path { path: PathBuf, len: u64 },
    Bytes(Vec<u8>),
}

/// A file picked for upload.
pub struct UploadFile {
    file_name: String,
    mime: String,
    source: UploadSource,
}

impl UploadFile {
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        if !metadata.is_file() {
            return Err(AppError::validation(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(sanitize_file_name)
            .ok_or_else(|| AppError::validation("File name is not valid UTF-8"))?;

        Ok(Self {
            file_name,
            mime: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            source: UploadSource::Path {
                path: path.to_path_buf(),
                len: metadata.len(),
            },
        })
    }

    pub fn from_bytes(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            file_name,
            mime,
            source: UploadSource::Bytes(data),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    async fn into_part(self) -> Result<Part> {
        let part = match self.source {
            UploadSource::Path { path, len } => {
                let file = tokio::fs::File::open(&path).await?;
                Part::stream_with_length(Body::wrap_stream(ReaderStream::new(file)), len)
            }
            UploadSource::Bytes(data) => Part::bytes(data),
        };

        part.file_name(self.file_name)
            .mime_str(&self.mime)
            .map_err(AppError::from)
    }
}

/// The file list of one storage owner, kept in step with the server.
pub struct FileCollectionController {
    gateway: ResourceGateway,
    owner: RwLock<Option<UserId>>,
    files: RwLock<Vec<FileRecord>>,
    feedback: ViewFeedback,
}

impl FileCollectionController {
    pub fn new(gateway: ResourceGateway, config: &Config) -> Self {
        Self {
            gateway,
            owner: RwLock::new(None),
            files: RwLock::new(Vec::new()),
            feedback: ViewFeedback::new(config.error_display_window()),
        }
    }

    pub fn owner(&self) -> Option<UserId> {
        *self.owner.read()
    }

    pub fn files(&self) -> Vec<FileRecord> {
        self.files.read().clone()
    }

    pub fn total_size_bytes(&self) -> u64 {
        self.files.read().iter().map(|f| f.size_bytes).sum()
    }

    pub fn is_loading(&self) -> bool {
        self.feedback.is_loading()
    }

    pub fn error(&self) -> Option<String> {
        self.feedback.error()
    }

    pub fn mount(&self) {
        self.feedback.mount();
    }

    pub fn unmount(&self) {
        self.feedback.unmount();
    }

    pub async fn load(&self, user_id: UserId) -> Result<()> {
        let ticket = self.feedback.begin();
        let outcome = self
            .gateway
            .get_json::<Vec<FileRecord>>(&format!("/storage/{}", user_id))
            .await;

        if ticket.is_live() {
            if let Ok(files) = &outcome {
                tracing::debug!(user_id, count = files.len(), "Storage loaded");
                *self.owner.write() = Some(user_id);
                *self.files.write() = files.clone();
                self.feedback.clear_error();
            }
        }

        ticket.settle(outcome.map(drop))
    }

    /// The server answers with the complete refreshed list, which replaces
    /// local state as is.
    pub async fn upload(&self, file: Option<UploadFile>, comment: &str) -> Result<()> {
        let Some(file) = file else {
            return self.feedback.reject(AppError::validation("No file selected"));
        };
        let owner = match self.require_owner() {
            Ok(owner) => owner,
            Err(e) => return self.feedback.reject(e),
        };

        let ticket = self.feedback.begin();
        let file_name = file.file_name().to_string();

        let outcome = async {
            let form = Form::new()
                .part("file", file.into_part().await?)
                .text("comment", comment.to_string());

            self.gateway
                .post_multipart::<Vec<FileRecord>>(&format!("/storage/{}", owner), form)
                .await
        }
        .await;

        if ticket.is_live() {
            if let Ok(files) = &outcome {
                tracing::info!(owner, file = %file_name, "File uploaded");
                *self.files.write() = files.clone();
            }
        }

        ticket.settle(outcome.map(drop))
    }

    pub async fn rename(&self, id: FileId, new_name: &str) -> Result<()> {
        let name = new_name.trim();
        if name.is_empty() {
            return self
                .feedback
                .reject(AppError::validation("File name must not be empty"));
        }
        let owner = match self.require_owner() {
            Ok(owner) => owner,
            Err(e) => return self.feedback.reject(e),
        };

        let ticket = self.feedback.begin();
        let outcome = self
            .gateway
            .patch_json::<_, FileRecord>(
                &format!("/storage/{}/{}", owner, id),
                &RenameRequest { name },
            )
            .await;

        if ticket.is_live() {
            if let Ok(updated) = &outcome {
                if let Some(slot) = self.files.write().iter_mut().find(|f| f.id == id) {
                    *slot = updated.clone();
                }
                tracing::info!(owner, id, name, "File renamed");
            }
        }

        ticket.settle(outcome.map(drop))
    }

    /// Removes the record only once the server confirms the delete.
    pub async fn delete(&self, id: FileId) -> Result<()> {
        let owner = match self.require_owner() {
            Ok(owner) => owner,
            Err(e) => return self.feedback.reject(e),
        };

        let ticket = self.feedback.begin();
        let outcome = self
            .gateway
            .delete(&format!("/storage/{}/{}", owner, id))
            .await;

        if ticket.is_live() && outcome.is_ok() {
            self.files.write().retain(|f| f.id != id);
            tracing::info!(owner, id, "File deleted");
        }

        ticket.settle(outcome)
    }

    /// Streams the file into `dest_dir` under the server-suggested name, or
    /// `file_<id>` when none is given.
    pub async fn request_download(&self, id: FileId, dest_dir: &Path) -> Result<DownloadedFile> {
        let ticket = self.feedback.begin();
        let outcome = self.download_into(id, dest_dir).await;
        ticket.settle(outcome)
    }

    /// Share links leave the local collection untouched.
    pub async fn request_share_link(&self, id: FileId) -> Result<String> {
        let owner = match self.require_owner() {
            Ok(owner) => owner,
            Err(e) => return self.feedback.reject(e),
        };

        let ticket = self.feedback.begin();
        let outcome = self
            .gateway
            .post_json::<_, ShareLinkResponse>(
                &format!("/storage/link/{}/{}", owner, id),
                &serde_json::json!({}),
            )
            .await
            .map(|response| response.file_link);

        ticket.settle(outcome)
    }

    fn require_owner(&self) -> Result<UserId> {
        self.owner()
            .ok_or_else(|| AppError::validation("No storage is loaded"))
    }

    async fn download_into(&self, id: FileId, dest_dir: &Path) -> Result<DownloadedFile> {
        let response = self
            .gateway
            .get_stream(&format!("/storage/download/{}", id))
            .await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| fallback_file_name(id));

        tokio::fs::create_dir_all(dest_dir).await?;
        let path = dest_dir.join(&file_name);
        let size_bytes = save_stream(response.bytes_stream(), &path).await?;

        tracing::info!(id, file = %file_name, size_bytes, "File downloaded");

        Ok(DownloadedFile {
            file_name,
            path,
            size_bytes,
        })
    }
}

/// Writes `stream` to a new file at `path`. A failed read or write removes
/// the partial file.
async fn save_stream<S, B, E>(stream: S, path: &Path) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<AppError>,
{
    let mut file = tokio::fs::File::create(path).await?;
    let written = write_chunks(stream, &mut file).await;
    drop(file);

    if written.is_err() {
        if let Err(e) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial download");
        }
    }
    written
}

/// Copies `stream` into `out`, returning the number of bytes written.
async fn write_chunks<S, B, E, W>(stream: S, out: &mut W) -> Result<u64>
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: Into<AppError>,
    W: AsyncWrite + Unpin,
{
    let mut stream = std::pin::pin!(stream);
    let mut size_bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::<AppError>::into)?;
        out.write_all(chunk.as_ref()).await?;
        size_bytes += chunk.as_ref().len() as u64;
    }
    out.flush().await?;
    Ok(size_bytes)
}
