use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, Mutex};

use crate::pipeline::types::TaskDescriptor;

/// FIFO, unbounded, single-consumer work queue. `enqueue` never blocks the
/// admitting request; `dequeue` parks the worker until an item arrives. The
/// receiver sits behind a mutex so the at-most-one-consumer contract holds
/// structurally, not by convention.
///
/// The queue is not persisted: descriptors enqueued before a crash are gone
/// after a restart and their tasks surface as perpetually queued until
/// re-submitted.
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<TaskDescriptor>,
    rx: Mutex<mpsc::UnboundedReceiver<TaskDescriptor>>,
    pending: AtomicUsize,
}

impl WorkQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(rx),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn enqueue(&self, task: TaskDescriptor) -> Result<()> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(task).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(anyhow::anyhow!("Work queue consumer is gone"));
        }
        Ok(())
    }

    /// Blocks until an item is available. Returns `None` only when every
    /// sender has been dropped, which ends the worker loop.
    pub async fn dequeue(&self) -> Option<TaskDescriptor> {
        let task = self.rx.lock().await.recv().await;
        if task.is_some() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
        }
        task
    }

    /// Point-in-time pending count for status reporting, not transactional.
    pub fn len(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}
