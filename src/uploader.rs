use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::ops::RangeInclusive;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, Duration, Instant};

use crate::errors::{AppError, AppResult};
use crate::queue::item::{FileMeta, ProgressUpdate};

/// What a finished upload attempt resolved to. Failure is the `Err` arm of
/// the result; the queue treats an error and an explicit failure identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadOutcome {
    pub uploaded_at: DateTime<Utc>,
}

/// One upload attempt for one file. Implementations send zero or more
/// progress samples over `progress` before resolving; samples sent after
/// resolution are dropped by the queue. A send failure means the queue is no
/// longer listening and can be ignored.
#[async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(
        &self,
        file: &FileMeta,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> AppResult<UploadOutcome>;
}

/// Mock transport: advances progress by randomized increments at randomized
/// intervals until 100%, then fails with `failure_rate` probability. A real
/// deployment replaces this with an actual transport behind the same trait.
#[derive(Debug, Clone)]
pub struct SimulatedUploader {
    failure_rate: f64,
    tick_ms: RangeInclusive<u64>,
}

impl SimulatedUploader {
    pub fn new() -> Self {
        Self {
            failure_rate: 0.1,
            tick_ms: 100..=300,
        }
    }

    pub fn with_failure_rate(mut self, failure_rate: f64) -> Self {
        self.failure_rate = failure_rate.clamp(0.0, 1.0);
        self
    }

    /// Shrink the tick interval, mainly so tests finish quickly.
    pub fn with_tick_range_ms(mut self, tick_ms: RangeInclusive<u64>) -> Self {
        self.tick_ms = tick_ms;
        self
    }
}

impl Default for SimulatedUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Uploader for SimulatedUploader {
    async fn upload(
        &self,
        file: &FileMeta,
        progress: UnboundedSender<ProgressUpdate>,
    ) -> AppResult<UploadOutcome> {
        let total = file.size_bytes.max(1);
        // At least 1KB steps so tiny files don't crawl
        let chunk = (total / 100).max(1024);

        let mut uploaded: u64 = 0;
        let started = Instant::now();

        while uploaded < total {
            let (delay_ms, increment) = {
                use rand::Rng;
                let mut rng = rand::rng();
                (
                    rng.random_range(self.tick_ms.clone()),
                    rng.random_range(1..=chunk * 2),
                )
            };

            sleep(Duration::from_millis(delay_ms)).await;

            uploaded = (uploaded + increment).min(total);
            let percent = ((uploaded as f64 / total as f64) * 100.0).round() as u8;
            let elapsed = started.elapsed().as_secs_f64();
            let speed = if elapsed > 0.0 {
                (uploaded as f64 / elapsed) as u64
            } else {
                0
            };

            let _ = progress.send(ProgressUpdate {
                progress_percent: percent,
                speed_bytes_per_sec: speed,
            });
        }

        let failed = {
            use rand::Rng;
            rand::rng().random::<f64>() < self.failure_rate
        };

        if failed {
            log::debug!("Simulated upload of {} failed", file.name);
            Err(AppError::upload_failed("Network error occurred"))
        } else {
            Ok(UploadOutcome {
                uploaded_at: Utc::now(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::unbounded_channel;

    fn meta() -> FileMeta {
        FileMeta {
            name: "clip.mp4".to_string(),
            size_bytes: 64 * 1024,
            mime_type: "video/mp4".to_string(),
        }
    }

    #[tokio::test]
    async fn reaches_full_progress_before_resolving() {
        let uploader = SimulatedUploader::new()
            .with_failure_rate(0.0)
            .with_tick_range_ms(0..=1);
        let (tx, mut rx) = unbounded_channel();

        let outcome = uploader.upload(&meta(), tx).await.unwrap();
        assert!(outcome.uploaded_at <= Utc::now());

        let mut last = 0u8;
        while let Ok(update) = rx.try_recv() {
            assert!(update.progress_percent <= 100);
            last = update.progress_percent;
        }
        assert_eq!(last, 100);
    }

    #[tokio::test]
    async fn certain_failure_rate_always_fails() {
        let uploader = SimulatedUploader::new()
            .with_failure_rate(1.0)
            .with_tick_range_ms(0..=1);
        let (tx, _rx) = unbounded_channel();

        let result = uploader.upload(&meta(), tx).await;
        match result {
            Err(AppError::UploadFailed { reason }) => {
                assert_eq!(reason, "Network error occurred");
            }
            other => panic!("expected upload failure, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn dropped_receiver_does_not_abort_the_attempt() {
        let uploader = SimulatedUploader::new()
            .with_failure_rate(0.0)
            .with_tick_range_ms(0..=1);
        let (tx, rx) = unbounded_channel();
        drop(rx);

        assert!(uploader.upload(&meta(), tx).await.is_ok());
    }
}
