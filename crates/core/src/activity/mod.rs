//! Activity feed records and sinks
//!
//! Significant execution events (tool calls, finished thinking spans, assistant
//! messages, final results) become [`ActivityRecord`]s delivered to an injected
//! [`ActivitySink`]. Delivery goes through an [`ActivityPublisher`] so a slow or
//! failing sink never holds up the execution stream.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use uuid::Uuid;

pub mod publisher;

pub use publisher::ActivityPublisher;

/// Kind of activity record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Message,
    ToolCall,
    Thinking,
    Error,
    Deployment,
}

/// One entry in an organization's activity feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub organization_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_name: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub record_type: ActivityType,
    /// Agent key of the producer
    pub actor: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// RFC 3339
    pub created_at: String,
}

impl ActivityRecord {
    pub fn new(
        record_type: ActivityType,
        content: impl Into<String>,
        context: &ActivityContext,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: context.organization_id.clone(),
            org_name: context.org_name.clone(),
            content: content.into(),
            record_type,
            actor: actor.into(),
            metadata: None,
            created_at: Utc::now().to_rfc3339(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Scope that activity records are filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityContext {
    pub organization_id: String,
    #[serde(default)]
    pub org_name: Option<String>,
}

impl ActivityContext {
    pub fn new(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            org_name: None,
        }
    }

    pub fn with_org_name(mut self, org_name: impl Into<String>) -> Self {
        self.org_name = Some(org_name.into());
        self
    }
}

/// Failure reported by a sink; logged by the publisher and never propagated
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for activity records
#[async_trait]
pub trait ActivitySink: Send + Sync {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError>;
}

#[async_trait]
impl<T: ActivitySink + ?Sized> ActivitySink for Arc<T> {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        (**self).record(record).await
    }
}

/// In-memory sink with bounded retention and live subscription
#[derive(Debug, Clone)]
pub struct ActivityLog {
    records: Arc<RwLock<Vec<ActivityRecord>>>,
    broadcaster: Arc<broadcast::Sender<ActivityRecord>>,
    capacity: usize,
}

impl ActivityLog {
    /// Create a log retaining the latest 1000 records
    pub fn new() -> Self {
        Self::with_capacity(1000)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _) = broadcast::channel(capacity);
        Self {
            records: Arc::new(RwLock::new(Vec::with_capacity(capacity))),
            broadcaster: Arc::new(tx),
            capacity,
        }
    }

    pub async fn push(&self, record: ActivityRecord) {
        let mut records = self.records.write().await;
        if records.len() >= self.capacity {
            records.remove(0);
        }
        records.push(record.clone());
        drop(records);

        let _ = self.broadcaster.send(record);
    }

    pub async fn records(&self) -> Vec<ActivityRecord> {
        self.records.read().await.clone()
    }

    /// Retained records of one type, oldest first
    pub async fn records_of(&self, record_type: ActivityType) -> Vec<ActivityRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.record_type == record_type)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Stream of records pushed after this call; lagged records are skipped
    pub fn subscribe(&self) -> impl futures_util::Stream<Item = ActivityRecord> + Send + 'static {
        BroadcastStream::new(self.broadcaster.subscribe()).filter_map(|item| item.ok())
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivitySink for ActivityLog {
    async fn record(&self, record: ActivityRecord) -> Result<(), SinkError> {
        self.push(record).await;
        Ok(())
    }
}
