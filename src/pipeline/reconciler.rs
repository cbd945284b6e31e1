use anyhow::Result;
use std::sync::Arc;
use tracing::warn;

use crate::pipeline::registry::TaskRegistry;
use crate::pipeline::types::{HistoryEntry, Lifecycle, TaskOutcome};
use crate::store::ArtifactStore;

/// Read-time status derivation shared by the result and history queries.
/// Two-tier lookup: the durable artifact store wins over the volatile
/// registry. A transcript artifact means done, whatever the registry thinks;
/// otherwise the registry value holds; otherwise the task is assumed still
/// queued. The conservative cold-start default means tasks lost with the
/// unpersisted queue show as queued until re-submitted.
pub struct StatusReconciler {
    store: Arc<ArtifactStore>,
    registry: Arc<TaskRegistry>,
}

impl StatusReconciler {
    pub fn new(store: Arc<ArtifactStore>, registry: Arc<TaskRegistry>) -> Self {
        Self { store, registry }
    }

    pub async fn resolve(&self, task_id: &str) -> Lifecycle {
        if self.store.has_transcript(task_id) {
            // Warm the cache after a restart. Only an absent entry is
            // written so the worker stays the single writer for live ids.
            if self.registry.get(task_id).await.is_none() {
                self.registry.set(task_id, Lifecycle::Done).await;
            }
            return Lifecycle::Done;
        }

        self.registry.get(task_id).await.unwrap_or(Lifecycle::Queued)
    }

    /// `None` means the task is still pending; `Some` is terminal and
    /// monotonic, since transcript artifacts are never deleted.
    pub async fn result(&self, task_id: &str) -> Result<Option<TaskOutcome>> {
        let Some(transcript) = self.store.read_transcript(task_id)? else {
            return Ok(None);
        };

        if self.registry.get(task_id).await.is_none() {
            self.registry.set(task_id, Lifecycle::Done).await;
        }

        let summary = self.store.read_summary(task_id)?.unwrap_or_default();
        Ok(Some(TaskOutcome { transcript, summary }))
    }

    /// Every known upload, reconciled and joined with its artifacts, newest
    /// first.
    pub async fn history(&self) -> Result<Vec<HistoryEntry>> {
        let mut entries = Vec::new();

        for record in self.store.list_uploads()? {
            let status = self.resolve(&record.task_id).await;

            let (transcript, summary) = if status == Lifecycle::Done {
                // An unreadable artifact degrades to an empty transcript
                // rather than failing the whole listing.
                let transcript = match self.store.read_transcript(&record.task_id) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Unreadable transcript for task {}: {}", record.task_id, e);
                        Some(String::new())
                    }
                };
                let summary = self.store.read_summary(&record.task_id).unwrap_or(None);
                (transcript, summary)
            } else {
                (None, None)
            };

            entries.push(HistoryEntry {
                id: record.task_id.clone(),
                filename: record.original_filename,
                status,
                transcript,
                summary,
                timestamp: record.created_at.format("%Y-%m-%d %H:%M").to_string(),
                raw_time: record.created_at.timestamp_millis(),
                audio_url: format!("/audio/{}", record.task_id),
            });
        }

        entries.sort_by(|a, b| b.raw_time.cmp(&a.raw_time));
        Ok(entries)
    }
}
