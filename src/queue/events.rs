use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use uuid::Uuid;

/// User-visible notices the queue surfaces while it works. A frontend renders
/// these as transient notifications; the queue itself only logs them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    FileQueued {
        id: Uuid,
        name: String,
    },
    FileRejected {
        name: String,
        reasons: Vec<String>,
    },
    DuplicateSkipped {
        name: String,
    },
    BatchLimitReached {
        name: String,
        max_files: usize,
    },
    UploadStarted {
        id: Uuid,
        name: String,
    },
    UploadProgress {
        id: Uuid,
        progress_percent: u8,
        speed_bytes_per_sec: u64,
    },
    UploadCompleted {
        id: Uuid,
        name: String,
    },
    UploadFailed {
        id: Uuid,
        name: String,
        error: String,
    },
    FileRemoved {
        id: Uuid,
        name: String,
    },
    RemovalBlocked {
        id: Uuid,
        name: String,
    },
    CompletedCleared {
        count: usize,
    },
    NothingToClear,
    HistoryError {
        message: String,
    },
}

/// Best-effort event delivery. A missing or gone subscriber never disturbs
/// queue state.
#[derive(Debug, Default)]
pub(crate) struct EventSink {
    sender: Option<UnboundedSender<QueueEvent>>,
}

impl EventSink {
    pub(crate) fn subscribe(&mut self) -> UnboundedReceiver<QueueEvent> {
        let (tx, rx) = unbounded_channel();
        self.sender = Some(tx);
        rx
    }

    pub(crate) fn emit(&self, event: QueueEvent) {
        if let Some(sender) = &self.sender {
            if sender.send(event).is_err() {
                log::warn!("Failed to deliver queue event (non-critical): subscriber gone");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_without_subscriber_is_a_no_op() {
        let sink = EventSink::default();
        sink.emit(QueueEvent::NothingToClear);
    }

    #[test]
    fn subscriber_receives_events_in_order() {
        let mut sink = EventSink::default();
        let mut rx = sink.subscribe();

        sink.emit(QueueEvent::NothingToClear);
        sink.emit(QueueEvent::CompletedCleared { count: 2 });

        assert_eq!(rx.try_recv().unwrap(), QueueEvent::NothingToClear);
        assert_eq!(
            rx.try_recv().unwrap(),
            QueueEvent::CompletedCleared { count: 2 }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_subscriber_does_not_poison_the_sink() {
        let mut sink = EventSink::default();
        let rx = sink.subscribe();
        drop(rx);

        sink.emit(QueueEvent::NothingToClear);
    }
}
