pub mod queue;
pub mod reconciler;
pub mod registry;
pub mod types;
pub mod worker;

pub use queue::WorkQueue;
pub use reconciler::StatusReconciler;
pub use registry::TaskRegistry;
pub use types::{
    CurrentTask, HistoryEntry, Lifecycle, TaskDescriptor, TaskOutcome, ERROR_MARKER,
};
pub use worker::TaskWorker;

#[cfg(test)]
mod tests;
