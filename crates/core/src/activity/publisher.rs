//! Fire-and-forget delivery of activity records
//!
//! A bounded queue sits between the execution stream and the sink. One worker
//! task drains it; `publish` only ever attempts a non-blocking send.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::{ActivityRecord, ActivitySink};

/// Default number of records that may wait for the sink
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Non-blocking front end for an [`ActivitySink`]
///
/// Cloning is cheap; every clone feeds the same worker. The worker exits once
/// every clone has been dropped and the queue is drained.
#[derive(Debug, Clone)]
pub struct ActivityPublisher {
    tx: Option<mpsc::Sender<ActivityRecord>>,
}

impl ActivityPublisher {
    /// Spawn a worker delivering to `sink`
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(sink: Arc<dyn ActivitySink>) -> Self {
        Self::with_capacity(sink, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(sink: Arc<dyn ActivitySink>, capacity: usize) -> Self {
        Self::spawn(sink, capacity).0
    }

    /// Like [`with_capacity`](Self::with_capacity), also returning the worker handle
    pub fn spawn(sink: Arc<dyn ActivitySink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<ActivityRecord>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(record) = rx.recv().await {
                let id = record.id;
                let record_type = record.record_type;
                if let Err(e) = sink.record(record).await {
                    tracing::warn!(%id, ?record_type, error = %e, "Failed to record activity");
                }
            }
            tracing::debug!("Activity publisher drained");
        });

        (Self { tx: Some(tx) }, worker)
    }

    /// A publisher that discards every record
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue a record without waiting; drops it if the queue is full or closed
    pub fn publish(&self, record: ActivityRecord) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(record) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(record)) => {
                tracing::warn!(id = %record.id, "Activity queue full, dropping record");
            }
            Err(mpsc::error::TrySendError::Closed(record)) => {
                tracing::warn!(id = %record.id, "Activity worker stopped, dropping record");
            }
        }
    }
}

impl Default for ActivityPublisher {
    fn default() -> Self {
        Self::disabled()
    }
}
