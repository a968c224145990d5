use thiserror::Error;

pub mod photos_store;
pub mod poller;
pub mod videos_store;

pub use photos_store::PhotosStore;
pub use poller::{PollHandle, StatusPoller};
pub use videos_store::VideosStore;

use crate::db::DbError;

/// store 内存列表的变更通知，订阅方收到后自行重新读取
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreChange {
    Loaded,
    Added(String),
    Updated(String),
    Deleted(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("未找到视频记录: {0}")]
    RecordNotFound(String),

    #[error("加载记录超时")]
    LoadTimeout,
}
