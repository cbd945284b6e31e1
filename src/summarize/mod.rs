use anyhow::Result;
use async_trait::async_trait;

pub mod ollama;

/// Summarization seam. Failures here are absorbed by the worker: a task is
/// still done without a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String>;
}
