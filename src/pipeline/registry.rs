use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::pipeline::types::{CurrentTask, Lifecycle};

/// Volatile id -> lifecycle map plus the "currently processing" pointer.
/// Authoritative for queued/processing/error only while the process is warm;
/// after a restart it starts empty and callers fall back to the artifact
/// store. Absence of an id is an expected condition, never an error.
///
/// Writers never race per id: admission writes the initial `queued`, the
/// single worker writes every later state, and the reconciler only warms an
/// absent entry with an artifact-derived `done`.
pub struct TaskRegistry {
    states: Mutex<HashMap<String, Lifecycle>>,
    current: Mutex<Option<CurrentTask>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            current: Mutex::new(None),
        }
    }

    /// Unconditional overwrite, last writer wins.
    pub async fn set(&self, task_id: &str, state: Lifecycle) {
        self.states.lock().await.insert(task_id.to_string(), state);
    }

    pub async fn get(&self, task_id: &str) -> Option<Lifecycle> {
        self.states.lock().await.get(task_id).copied()
    }

    pub async fn set_current(&self, task_id: &str, file: &str) {
        *self.current.lock().await = Some(CurrentTask {
            id: task_id.to_string(),
            file: file.to_string(),
        });
    }

    pub async fn clear_current(&self) {
        *self.current.lock().await = None;
    }

    pub async fn current(&self) -> Option<CurrentTask> {
        self.current.lock().await.clone()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
