pub mod feedback;
pub mod file_collection;
pub mod gateway;
pub mod user_directory;

pub use file_collection::{FileCollectionController, UploadFile};
pub use gateway::ResourceGateway;
pub use user_directory::UserDirectoryController;
