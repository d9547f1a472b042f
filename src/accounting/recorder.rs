//! Usage recorder
//!
//! Persists one accounting record per request that reached a backend call.
//! The sink is append-only; recording failures are logged and never fail
//! the client-visible response.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;
use tracing::{debug, error};
use uuid::Uuid;

/// One accounting record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub binding_key: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub prompt_chars: usize,
    pub completion_chars: usize,
    /// None when the binding has no pricing configured
    pub cost: Option<f64>,
    pub currency: String,
    /// True when the token counts were estimated rather than reported by
    /// the backend
    pub estimated: bool,
    pub correlation_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Append-only usage store
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn append(&self, record: &UsageRecord) -> Result<()>;
}

/// JSONL file sink, one record per line
#[derive(Debug)]
pub struct JsonlUsageSink {
    path: PathBuf,
}

impl JsonlUsageSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl UsageSink for JsonlUsageSink {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        let mut line = serde_json::to_string(record).context("Failed to serialize record")?;
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open usage log: {:?}", self.path))?;

        file.write_all(line.as_bytes())
            .await
            .context("Failed to append usage record")?;
        file.flush().await.context("Failed to flush usage log")?;

        debug!("appended usage record {}", record.correlation_id);
        Ok(())
    }
}

/// In-memory sink for tests
#[derive(Debug, Default)]
pub struct MemoryUsageSink {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemoryUsageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<UsageRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UsageSink for MemoryUsageSink {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        self.records
            .lock()
            .map_err(|_| anyhow::anyhow!("records lock poisoned"))?
            .push(record.clone());
        Ok(())
    }
}

/// Append a record, logging failure instead of propagating it. Accounting
/// must complete before the handler returns but must never fail the
/// client-visible response.
pub async fn record_usage(sink: &dyn UsageSink, record: UsageRecord) {
    if let Err(e) = sink.append(&record).await {
        error!(
            "failed to persist usage record {}: {:#}",
            record.correlation_id, e
        );
    }
}
