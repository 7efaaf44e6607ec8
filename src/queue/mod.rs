// Upload queue core: item lifecycle, the manager that drives it, and the
// notices it surfaces along the way.

pub mod events;
pub mod item;
pub mod manager;

pub use events::QueueEvent;
pub use item::{FileMeta, ProgressUpdate, UploadItem, UploadStatus};
pub use manager::{AddOutcome, AddReport, QueueStats, UploadQueue};
