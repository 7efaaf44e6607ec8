//! File upload queue manager: validates and queues files, drives each one
//! through its upload lifecycle sequentially with live progress, and records
//! finished attempts in a pluggable history store. The transport and the
//! persistence medium sit behind the [`Uploader`] and [`HistoryStore`]
//! traits; a randomized [`SimulatedUploader`] and a SQLite-backed history
//! store ship in the box.

pub mod config;
pub mod errors;
pub mod history;
pub mod queue;
pub mod uploader;
pub mod validation;

pub use config::{load_config, save_config, UploadConfig, CONFIG_NAMESPACE};
pub use errors::{AppError, AppResult};
pub use history::{
    HistoryRecord, HistoryStore, MemoryHistoryStore, SqliteHistoryStore, HISTORY_CAPACITY,
};
pub use queue::{
    AddOutcome, AddReport, FileMeta, ProgressUpdate, QueueEvent, QueueStats, UploadItem,
    UploadQueue, UploadStatus,
};
pub use uploader::{SimulatedUploader, UploadOutcome, Uploader};
