use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use uuid::Uuid;

use crate::config::{validate_config, UploadConfig};
use crate::errors::{AppError, AppResult};
use crate::history::{HistoryRecord, HistoryStore};
use crate::uploader::Uploader;
use crate::validation::validate_file;

use super::events::{EventSink, QueueEvent};
use super::item::{FileMeta, UploadItem, UploadStatus};

/// Per-file outcome of an add call. Nothing is ever silently dropped: every
/// input file maps to exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added(Uuid),
    Rejected { violations: Vec<String> },
    Duplicate,
    BatchLimit,
}

/// What one `add_files` call did, file by file in input order.
#[derive(Debug, Clone, Default)]
pub struct AddReport {
    pub outcomes: Vec<(String, AddOutcome)>,
    /// Ids of the freshly created items, in queue order.
    pub added: Vec<Uuid>,
}

impl AddReport {
    pub fn added_count(&self) -> usize {
        self.added.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub total: usize,
    pub queued: usize,
    pub uploading: usize,
    pub complete: usize,
    pub failed: usize,
    pub paused: usize,
}

/// The upload queue manager. Owns the list of files to be uploaded, drives
/// each through queued → uploading → complete/failed, and forwards finished
/// attempts to the history store.
///
/// All methods take `&mut self`, so batches are inherently sequential: one
/// item's upload fully settles before the next begins.
pub struct UploadQueue<U, H> {
    items: Vec<UploadItem>,
    config: UploadConfig,
    uploader: U,
    history: H,
    events: EventSink,
}

impl<U, H> UploadQueue<U, H>
where
    U: Uploader,
    H: HistoryStore,
{
    pub fn new(config: UploadConfig, uploader: U, history: H) -> Self {
        Self {
            items: Vec::new(),
            config,
            uploader,
            history,
            events: EventSink::default(),
        }
    }

    /// Subscribe to queue notices. Replaces any previous subscriber.
    pub fn subscribe(&mut self) -> UnboundedReceiver<QueueEvent> {
        self.events.subscribe()
    }

    pub fn items(&self) -> &[UploadItem] {
        &self.items
    }

    pub fn item(&self, id: Uuid) -> Option<&UploadItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: UploadConfig) -> AppResult<()> {
        validate_config(&config)?;
        self.config = config;
        Ok(())
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.items.len(),
            ..QueueStats::default()
        };

        for item in &self.items {
            match item.status {
                UploadStatus::Queued => stats.queued += 1,
                UploadStatus::Uploading => stats.uploading += 1,
                UploadStatus::Complete => stats.complete += 1,
                UploadStatus::Failed => stats.failed += 1,
                UploadStatus::Paused => stats.paused += 1,
            }
        }

        stats
    }

    /// Attach derived preview data to a queued item.
    pub fn attach_thumbnail(&mut self, id: Uuid, thumbnail: String) -> AppResult<()> {
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::UnknownItem { id })?;
        item.thumbnail = Some(thumbnail);
        Ok(())
    }

    /// Validate and enqueue a batch of files.
    ///
    /// Validation runs against a config snapshot taken at entry, so a
    /// concurrent settings save cannot change the rules mid-batch. A file
    /// whose `(name, size)` already exists in the active queue is skipped as
    /// a duplicate; files beyond `max_files` accepted in this call are
    /// skipped with a batch-limit notice. When auto-upload is enabled the
    /// freshly created items are uploaded immediately; items already in the
    /// queue are left alone.
    pub async fn add_files(&mut self, files: &[FileMeta]) -> AddReport {
        let config = self.config.clone();
        let mut report = AddReport::default();

        for file in files {
            let violations = validate_file(file, &config);
            if !violations.is_empty() {
                log::warn!("{}: {}", file.name, violations.join(", "));
                self.events.emit(QueueEvent::FileRejected {
                    name: file.name.clone(),
                    reasons: violations.clone(),
                });
                report
                    .outcomes
                    .push((file.name.clone(), AddOutcome::Rejected { violations }));
                continue;
            }

            let duplicate = self
                .items
                .iter()
                .any(|i| i.name == file.name && i.size_bytes == file.size_bytes);
            if duplicate {
                log::warn!("{} is already in the queue", file.name);
                self.events.emit(QueueEvent::DuplicateSkipped {
                    name: file.name.clone(),
                });
                report
                    .outcomes
                    .push((file.name.clone(), AddOutcome::Duplicate));
                continue;
            }

            if report.added.len() >= config.max_files {
                log::warn!(
                    "{} skipped: batch limit of {} files reached",
                    file.name,
                    config.max_files
                );
                self.events.emit(QueueEvent::BatchLimitReached {
                    name: file.name.clone(),
                    max_files: config.max_files,
                });
                report
                    .outcomes
                    .push((file.name.clone(), AddOutcome::BatchLimit));
                continue;
            }

            let item = UploadItem::new(file.clone());
            log::info!("Added {} to queue", item.name);
            self.events.emit(QueueEvent::FileQueued {
                id: item.id,
                name: item.name.clone(),
            });
            report.outcomes.push((item.name.clone(), AddOutcome::Added(item.id)));
            report.added.push(item.id);
            self.items.push(item);
        }

        // Auto-upload covers only the items this call created, never items
        // that are already uploading or complete.
        if config.auto_upload && !report.added.is_empty() {
            let fresh = report.added.clone();
            self.start_upload(Some(&fresh)).await;
        }

        report
    }

    /// Upload a batch, one item at a time.
    ///
    /// With no explicit selection, every queued or failed item is taken, in
    /// queue order. An explicitly selected item is processed whatever its
    /// status, except that an item already uploading is skipped. Each
    /// attempt's failure is contained to its item; the batch always runs to
    /// the end.
    pub async fn start_upload(&mut self, selection: Option<&[Uuid]>) {
        let batch: Vec<Uuid> = match selection {
            Some(ids) => ids.to_vec(),
            None => self
                .items
                .iter()
                .filter(|i| i.status.is_startable())
                .map(|i| i.id)
                .collect(),
        };

        for id in batch {
            let Some(item) = self.items.iter_mut().find(|i| i.id == id) else {
                log::warn!("Skipping unknown item {} in upload batch", id);
                continue;
            };

            if item.status == UploadStatus::Uploading {
                log::debug!("{} is already uploading, skipping", item.name);
                continue;
            }

            item.mark_uploading();
            let name = item.name.clone();
            let meta = item.meta();
            self.events.emit(QueueEvent::UploadStarted {
                id,
                name: name.clone(),
            });

            let (progress_tx, mut progress_rx) = unbounded_channel();
            let result = {
                let fut = self.uploader.upload(&meta, progress_tx);
                tokio::pin!(fut);
                loop {
                    tokio::select! {
                        res = &mut fut => break res,
                        Some(update) = progress_rx.recv() => {
                            if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                                if item.apply_progress(update) {
                                    self.events.emit(QueueEvent::UploadProgress {
                                        id,
                                        progress_percent: item.progress_percent,
                                        speed_bytes_per_sec: item.upload_speed_bytes_per_sec,
                                    });
                                }
                            }
                        }
                    }
                }
            };
            // Samples still buffered in the channel lost the race against
            // resolution; the item has already left uploading.
            drop(progress_rx);

            match result {
                Ok(outcome) => {
                    if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                        item.mark_complete(outcome.uploaded_at);
                    }
                    log::info!("{} uploaded successfully", name);
                    self.events.emit(QueueEvent::UploadCompleted {
                        id,
                        name: name.clone(),
                    });
                }
                Err(e) => {
                    let reason = e.to_string();
                    if let Some(item) = self.items.iter_mut().find(|i| i.id == id) {
                        item.mark_failed(reason.clone());
                    }
                    log::error!("{} upload failed: {}", name, reason);
                    self.events.emit(QueueEvent::UploadFailed {
                        id,
                        name: name.clone(),
                        error: reason,
                    });
                }
            }

            let record = self.items.iter().find(|i| i.id == id).map(HistoryRecord::from);
            if let Some(record) = record {
                if let Err(e) = self.history.save(&record).await {
                    log::warn!(
                        "Failed to persist history for {} (non-critical): {}",
                        record.name,
                        e
                    );
                    self.events.emit(QueueEvent::HistoryError {
                        message: e.to_string(),
                    });
                }
            }
        }
    }

    /// Remove an item from the queue. A no-op with a warning while the item
    /// is uploading; removal never cancels an in-flight attempt.
    pub fn remove_file(&mut self, id: Uuid) -> AppResult<()> {
        let Some(pos) = self.items.iter().position(|i| i.id == id) else {
            return Err(AppError::UnknownItem { id });
        };

        if self.items[pos].status == UploadStatus::Uploading {
            let name = self.items[pos].name.clone();
            log::warn!("Cannot remove {} while uploading", name);
            self.events.emit(QueueEvent::RemovalBlocked { id, name });
            return Ok(());
        }

        let item = self.items.remove(pos);
        log::info!("{} removed from queue", item.name);
        self.events.emit(QueueEvent::FileRemoved {
            id,
            name: item.name,
        });
        Ok(())
    }

    /// Re-run the upload for one item, whatever its current status. The
    /// intended precondition is a failed item.
    pub async fn retry_upload(&mut self, id: Uuid) -> AppResult<()> {
        if !self.items.iter().any(|i| i.id == id) {
            return Err(AppError::UnknownItem { id });
        }

        self.start_upload(Some(&[id])).await;
        Ok(())
    }

    /// Drop every completed item from the queue and the matching history
    /// records. Returns how many items were cleared; calling it again with
    /// nothing newly completed is a no-op.
    pub async fn clear_completed(&mut self) -> AppResult<usize> {
        let ids: Vec<Uuid> = self
            .items
            .iter()
            .filter(|i| i.status == UploadStatus::Complete)
            .map(|i| i.id)
            .collect();

        if ids.is_empty() {
            log::info!("No completed uploads to clear");
            self.events.emit(QueueEvent::NothingToClear);
            return Ok(0);
        }

        self.items.retain(|i| i.status != UploadStatus::Complete);

        // Best effort: the in-memory queue stays authoritative even when the
        // history store misbehaves.
        if let Err(e) = self.history.clear(&ids).await {
            log::warn!("Failed to clear history records (non-critical): {}", e);
            self.events.emit(QueueEvent::HistoryError {
                message: e.to_string(),
            });
        }

        log::info!("Cleared {} completed uploads", ids.len());
        self.events.emit(QueueEvent::CompletedCleared { count: ids.len() });
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MemoryHistoryStore;
    use crate::uploader::UploadOutcome;
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::mpsc::UnboundedSender;

    use crate::queue::item::ProgressUpdate;

    struct InstantUploader;

    #[async_trait]
    impl Uploader for InstantUploader {
        async fn upload(
            &self,
            _file: &FileMeta,
            _progress: UnboundedSender<ProgressUpdate>,
        ) -> AppResult<UploadOutcome> {
            Ok(UploadOutcome {
                uploaded_at: Utc::now(),
            })
        }
    }

    fn meta(name: &str, size_bytes: u64) -> FileMeta {
        FileMeta {
            name: name.to_string(),
            size_bytes,
            mime_type: "text/plain".to_string(),
        }
    }

    fn queue() -> UploadQueue<InstantUploader, MemoryHistoryStore> {
        UploadQueue::new(
            UploadConfig::default(),
            InstantUploader,
            MemoryHistoryStore::new(),
        )
    }

    #[tokio::test]
    async fn remove_is_a_noop_only_while_uploading() {
        let mut queue = queue();
        let report = queue.add_files(&[meta("a.txt", 500)]).await;
        let id = report.added[0];

        // Force the in-flight state; removal must leave the item in place.
        queue.items[0].mark_uploading();
        assert!(queue.remove_file(id).is_ok());
        assert_eq!(queue.items.len(), 1);

        queue.items[0].mark_failed("boom".to_string());
        assert!(queue.remove_file(id).is_ok());
        assert!(queue.items.is_empty());
    }

    #[tokio::test]
    async fn default_batch_skips_items_that_are_not_startable() {
        let mut queue = queue();
        queue
            .add_files(&[meta("a.txt", 1), meta("b.txt", 2), meta("c.txt", 3)])
            .await;

        queue.items[0].mark_uploading();
        queue.items[0].mark_complete(Utc::now());
        queue.items[1].mark_uploading();
        queue.items[1].mark_failed("boom".to_string());

        queue.start_upload(None).await;

        // The complete item is untouched, the failed and queued ones ran.
        assert_eq!(queue.items[0].status, UploadStatus::Complete);
        assert_eq!(queue.items[1].status, UploadStatus::Complete);
        assert_eq!(queue.items[2].status, UploadStatus::Complete);
    }

    #[tokio::test]
    async fn explicit_selection_skips_uploading_items() {
        let mut queue = queue();
        let report = queue.add_files(&[meta("a.txt", 1)]).await;
        let id = report.added[0];

        queue.items[0].mark_uploading();
        queue.items[0].progress_percent = 40;

        queue.start_upload(Some(&[id])).await;

        // Still mid-flight from the queue's point of view, not restarted.
        assert_eq!(queue.items[0].status, UploadStatus::Uploading);
        assert_eq!(queue.items[0].progress_percent, 40);
    }

    #[tokio::test]
    async fn set_config_rejects_invalid_settings() {
        let mut queue = queue();
        let bad = UploadConfig {
            max_files: 0,
            ..UploadConfig::default()
        };
        assert!(queue.set_config(bad).is_err());
        assert_eq!(queue.config().max_files, 10);
    }

    #[tokio::test]
    async fn attach_thumbnail_requires_a_known_item() {
        let mut queue = queue();
        let report = queue.add_files(&[meta("a.png", 10)]).await;

        assert!(queue
            .attach_thumbnail(report.added[0], "data:image/jpeg;base64,xyz".to_string())
            .is_ok());
        assert!(queue
            .attach_thumbnail(Uuid::new_v4(), "ignored".to_string())
            .is_err());
    }
}
