use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::summarize::Summarizer;

const SUMMARY_PROMPT: &str = "Summarize the following meeting transcript into concise bullet points. \
Capture key decisions and action items:";

/// Summarizes transcripts through a local Ollama instance via its chat API.
pub struct OllamaSummarizer {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

impl OllamaSummarizer {
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            model,
        }
    }
}

#[async_trait]
impl Summarizer for OllamaSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: format!("{}\n\n{}", SUMMARY_PROMPT, transcript),
            }],
            stream: false,
        };

        info!("Requesting summary from {} with model {}", url, self.model);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Ollama request failed with status: {}",
                response.status()
            ));
        }

        let body: ChatResponse = response.json().await?;
        Ok(body.message.content)
    }
}
