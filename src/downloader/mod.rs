pub mod error;
pub mod events;
pub mod manager;
pub mod task;

pub use error::DownloadError;
pub use events::DownloadEvent;
pub use manager::DownloadManager;
