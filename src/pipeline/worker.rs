use std::sync::Arc;
use tracing::{error, info, warn};

use anyhow::Result;

use crate::asr::AsrEngine;
use crate::pipeline::queue::WorkQueue;
use crate::pipeline::registry::TaskRegistry;
use crate::pipeline::types::{Lifecycle, TaskDescriptor, ERROR_MARKER};
use crate::store::ArtifactStore;
use crate::summarize::Summarizer;

/// The sole queue consumer. Drives each task through
/// `queued -> processing -> {done, error}` with write-before-transition
/// discipline: a terminal state is only published after its artifact is
/// durable. Strictly one task is in flight at any time; an engine call that
/// hangs blocks every task behind it.
pub struct TaskWorker {
    registry: Arc<TaskRegistry>,
    queue: Arc<WorkQueue>,
    store: Arc<ArtifactStore>,
    asr: Arc<dyn AsrEngine>,
    summarizer: Arc<dyn Summarizer>,
}

impl TaskWorker {
    pub fn new(
        registry: Arc<TaskRegistry>,
        queue: Arc<WorkQueue>,
        store: Arc<ArtifactStore>,
        asr: Arc<dyn AsrEngine>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            registry,
            queue,
            store,
            asr,
            summarizer,
        }
    }

    pub async fn run(&self) {
        info!("Worker loop started");
        while let Some(task) = self.queue.dequeue().await {
            if let Err(e) = self.process(&task).await {
                // Storage failure: the lifecycle must not advance past a
                // failed write, so the task surfaces as error instead.
                error!("Task {} failed to persist its artifact: {}", task.id, e);
                self.registry.set(&task.id, Lifecycle::Error).await;
            }

            // Keep the pointer up between back-to-back tasks so the status
            // endpoint does not flicker to idle.
            if self.queue.is_empty() {
                self.registry.clear_current().await;
            }
        }
        info!("Worker loop stopped, queue closed");
    }

    async fn process(&self, task: &TaskDescriptor) -> Result<()> {
        self.registry.set(&task.id, Lifecycle::Processing).await;
        self.registry.set_current(&task.id, &task.original_filename).await;
        info!("Processing task {} ({})", task.id, task.original_filename);

        let (transcript, transcription_failed) = match self.asr.transcribe(&task.audio_path).await {
            Ok(text) => (text, false),
            Err(e) => {
                warn!("Transcription failed for task {}: {}", task.id, e);
                (format!("{} {}", ERROR_MARKER, e), true)
            }
        };

        // The artifact must be durable before any terminal state is
        // reported; "file exists" always means "attempt completed".
        self.store.write_transcript(&task.id, &transcript)?;

        if transcription_failed {
            self.registry.set(&task.id, Lifecycle::Error).await;
            return Ok(());
        }

        // Best effort: a missing summary never regresses a successful
        // transcription.
        match self.summarizer.summarize(&transcript).await {
            Ok(summary) => {
                if let Err(e) = self.store.write_summary(&task.id, &summary) {
                    warn!("Failed to persist summary for task {}: {}", task.id, e);
                }
            }
            Err(e) => warn!("Summarization skipped for task {}: {}", task.id, e),
        }

        self.registry.set(&task.id, Lifecycle::Done).await;
        info!("Task {} done", task.id);
        Ok(())
    }
}
