use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;

/// Prefix written into a transcript artifact when transcription fails. The
/// artifact always exists once an attempt completed; its content tells a
/// failed attempt apart from a successful one.
pub const ERROR_MARKER: &str = "Error:";

/// Unit of work handed from admission to the worker. The audio blob is
/// durably stored before a descriptor is ever enqueued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: String,
    pub original_filename: String,
    pub audio_path: PathBuf,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lifecycle {
    Queued,
    Processing,
    Done,
    Error,
}

impl Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Lifecycle::Queued => "queued",
            Lifecycle::Processing => "processing",
            Lifecycle::Done => "done",
            Lifecycle::Error => "error",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of the task the worker is currently on, published for the status
/// endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentTask {
    pub id: String,
    pub file: String,
}

/// One row of the history listing, joined from the upload namespace, the
/// reconciled status and the text artifacts.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub filename: String,
    pub status: Lifecycle,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub timestamp: String,
    pub raw_time: i64,
    pub audio_url: String,
}

/// Completed-task payload for the result endpoint. A missing summary is a
/// valid terminal outcome and surfaces as an empty string.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub transcript: String,
    pub summary: String,
}
