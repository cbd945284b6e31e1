use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

pub mod whisper;

/// Speech-to-text seam. An engine owns decoding and model invocation; callers
/// hand over the stored audio path and get plain text back. Engine errors are
/// per-task failures, never process-fatal.
#[async_trait]
pub trait AsrEngine: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}
