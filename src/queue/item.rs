use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The identity the queue and its collaborators key a file on. The binary
/// payload itself never travels through the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Queued,
    Uploading,
    Complete,
    Failed,
    Paused,
}

impl UploadStatus {
    /// Statuses a default upload batch selects.
    pub fn is_startable(&self) -> bool {
        matches!(self, UploadStatus::Queued | UploadStatus::Failed)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UploadStatus::Queued => "queued",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Complete => "complete",
            UploadStatus::Failed => "failed",
            UploadStatus::Paused => "paused",
        };
        f.write_str(s)
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(UploadStatus::Queued),
            "uploading" => Ok(UploadStatus::Uploading),
            "complete" => Ok(UploadStatus::Complete),
            "failed" => Ok(UploadStatus::Failed),
            "paused" => Ok(UploadStatus::Paused),
            other => Err(format!("unknown upload status: {}", other)),
        }
    }
}

/// A live progress sample from an in-flight upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressUpdate {
    pub progress_percent: u8,
    pub speed_bytes_per_sec: u64,
}

/// One queued, in-flight or finished file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    pub id: Uuid,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub upload_speed_bytes_per_sec: u64,
    pub error: Option<String>,
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Derived preview data supplied by the caller, never authoritative.
    pub thumbnail: Option<String>,
}

impl UploadItem {
    pub fn new(meta: FileMeta) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: meta.name,
            size_bytes: meta.size_bytes,
            mime_type: meta.mime_type,
            status: UploadStatus::Queued,
            progress_percent: 0,
            upload_speed_bytes_per_sec: 0,
            error: None,
            uploaded_at: None,
            thumbnail: None,
        }
    }

    pub fn meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            size_bytes: self.size_bytes,
            mime_type: self.mime_type.clone(),
        }
    }

    pub(crate) fn mark_uploading(&mut self) {
        self.status = UploadStatus::Uploading;
        self.progress_percent = 0;
        self.upload_speed_bytes_per_sec = 0;
        self.error = None;
    }

    pub(crate) fn mark_complete(&mut self, uploaded_at: DateTime<Utc>) {
        self.status = UploadStatus::Complete;
        self.progress_percent = 100;
        self.error = None;
        self.uploaded_at = Some(uploaded_at);
    }

    pub(crate) fn mark_failed(&mut self, reason: String) {
        self.status = UploadStatus::Failed;
        self.progress_percent = 0;
        self.upload_speed_bytes_per_sec = 0;
        self.error = Some(reason);
        self.uploaded_at = None;
    }

    /// Apply a live progress sample. Returns false when the sample is stale:
    /// the item already transitioned out of uploading, or the percentage
    /// would move backwards.
    pub(crate) fn apply_progress(&mut self, update: ProgressUpdate) -> bool {
        if self.status != UploadStatus::Uploading {
            return false;
        }

        let percent = update.progress_percent.min(100);
        if percent < self.progress_percent {
            return false;
        }

        self.progress_percent = percent;
        self.upload_speed_bytes_per_sec = update.speed_bytes_per_sec;
        true
    }
}
