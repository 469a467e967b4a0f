//! The delegated checkpoint persistence contract.

use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::Mutex;

/// A persisted checkpoint, as the orchestrator's external state store
/// sees it: opaque to everything but `workflow_name`/`current_step`/
/// `updated_at`, with the pipeline's own structure folded into
/// `metadata`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub id: String,
    pub workflow_name: String,
    pub current_step: String,
    pub metadata: Map<String, Value>,
    pub updated_at: DateTime<Utc>,
}

/// The minimal persistence contract the orchestrator needs: the most
/// recent checkpoint (if any) and a way to save a new one.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// The most recently saved checkpoint, if any exists yet.
    async fn latest_run(&self) -> Result<Option<WorkflowState>>;

    /// Persist `state`, replacing whatever was previously latest.
    async fn save(&self, state: WorkflowState) -> Result<()>;
}

/// Persists a single JSON-encoded [`WorkflowState`] to a file path,
/// serializing writers with an internal mutex since the orchestrator
/// treats every `save` as atomic from its own perspective.
pub struct JsonFileStateStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }
}

#[async_trait]
impl StateStore for JsonFileStateStore {
    async fn latest_run(&self) -> Result<Option<WorkflowState>> {
        let _guard = self.lock.lock().await;
        let mut file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents).await?;
        if contents.trim().is_empty() {
            return Ok(None);
        }

        Ok(Some(serde_json::from_str(&contents)?))
    }

    async fn save(&self, state: WorkflowState) -> Result<()> {
        let _guard = self.lock.lock().await;
        let serialized = serde_json::to_string_pretty(&state)?;
        let mut file = tokio::fs::File::create(&self.path).await?;
        file.write_all(serialized.as_bytes()).await?;
        Ok(())
    }
}
