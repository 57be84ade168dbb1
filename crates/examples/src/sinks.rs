//! Activity sinks for local runs

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use glyx_core::{ActivityRecord, ActivitySink, SinkError};

/// Prints each record as a one-line summary on stderr
#[derive(Debug, Default, Clone)]
pub struct StderrSink;

#[async_trait]
impl ActivitySink for StderrSink {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        let kind = serde_json::to_value(record.record_type)?;
        eprintln!(
            "[activity] {} {}: {}",
            record.actor,
            kind.as_str().unwrap_or("unknown"),
            record.content
        );
        Ok(())
    }
}

/// Appends records as JSON lines to a file
#[derive(Debug)]
pub struct JsonlFileSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ActivitySink for JsonlFileSink {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
