#![allow(clippy::uninlined_format_args)]

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use scribe_rs::{
    asr::whisper::WhisperAsr,
    pipeline::{StatusReconciler, TaskRegistry, TaskWorker, WorkQueue},
    store::ArtifactStore,
    summarize::ollama::OllamaSummarizer,
    utils::logger,
    AppContext, LISTEN_ADDR, MODEL_PATH, OLLAMA_MODEL, OLLAMA_URL, RESULTS_PATH, UPLOAD_PATH,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _guard = logger::init("./logs".to_string())?;
    scribe_rs::init_env();

    info!("Starting transcription service...");

    info!("Loading whisper model from {}", MODEL_PATH.as_str());
    let asr = Arc::new(WhisperAsr::new(MODEL_PATH.clone())?);

    let summarizer = Arc::new(OllamaSummarizer::new(
        OLLAMA_URL.clone(),
        OLLAMA_MODEL.clone(),
    ));

    info!("Initializing artifact store...");
    let store = Arc::new(ArtifactStore::new(
        UPLOAD_PATH.as_str(),
        RESULTS_PATH.as_str(),
    )?);
    let registry = Arc::new(TaskRegistry::new());
    let queue = Arc::new(WorkQueue::new());
    let reconciler = Arc::new(StatusReconciler::new(store.clone(), registry.clone()));

    info!("Starting worker...");
    let worker = Arc::new(TaskWorker::new(
        registry.clone(),
        queue.clone(),
        store.clone(),
        asr,
        summarizer,
    ));
    tokio::spawn(async move { worker.run().await });

    let ctx = Arc::new(AppContext {
        store,
        registry,
        queue,
        reconciler,
    });

    let addr: SocketAddr = LISTEN_ADDR.parse()?;
    match scribe_rs::web::start_server(ctx, addr).await {
        Ok(_) => info!("Server stopped gracefully"),
        Err(e) => {
            tracing::error!("Server error: {}", e);
            return Err(e);
        }
    }

    Ok(())
}
