//! Client-side session and resource controllers for the My Cloud file
//! storage service.
//!
//! [`auth::SessionController`] owns the signed-in identity,
//! [`services::ResourceGateway`] talks to the server on its behalf, and the
//! [`services::FileCollectionController`] / [`services::UserDirectoryController`]
//! keep local copies of the server's collections. [`auth::decide`] gates every
//! protected view.

pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::{
    auth::{CredentialStore, FileCredentialStore, SessionController, SessionHandle},
    config::Config,
    errors::Result,
    services::{FileCollectionController, ResourceGateway, UserDirectoryController},
};

/// Everything a shell needs, wired against one configuration.
pub struct Client {
    pub config: Config,
    pub session: SessionController,
}

impl Client {
    /// Builds the client on the durable credential file from `config` and
    /// restores any previous session from it.
    pub fn open(config: Config) -> Result<Self> {
        let store = Arc::new(FileCredentialStore::open(&config.credentials_path)?);
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let gateway = ResourceGateway::new(&config, SessionHandle::new(store))?;
        let session = SessionController::new(gateway);
        session.restore_from_storage()?;

        Ok(Self { config, session })
    }

    pub fn file_collection(&self) -> FileCollectionController {
        FileCollectionController::new(self.session.gateway().clone(), &self.config)
    }

    pub fn user_directory(&self) -> UserDirectoryController {
        UserDirectoryController::new(self.session.gateway().clone(), &self.config)
    }
}
