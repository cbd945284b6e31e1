pub mod asr;
pub mod audio;
pub mod pipeline;
pub mod store;
pub mod summarize;
pub mod utils;
pub mod web;

use std::{env, sync::Arc};
use once_cell::sync::Lazy;

use pipeline::{StatusReconciler, TaskRegistry, WorkQueue};
use store::ArtifactStore;

pub struct AppContext {
    pub store: Arc<ArtifactStore>,
    pub registry: Arc<TaskRegistry>,
    pub queue: Arc<WorkQueue>,
    pub reconciler: Arc<StatusReconciler>,
}

const UPLOAD_PATH_DEFAULT: &str = "./scribe_data/uploads";
const RESULTS_PATH_DEFAULT: &str = "./scribe_data/results";
const MODEL_PATH_DEFAULT: &str = "./models/ggml-tiny.bin";
const OLLAMA_URL_DEFAULT: &str = "http://127.0.0.1:11434";
const OLLAMA_MODEL_DEFAULT: &str = "gemma3:270m";
const LISTEN_ADDR_DEFAULT: &str = "0.0.0.0:5000";

fn env_or(key: &str, default: &str) -> String {
    match env::var(key) {
        Ok(value) => value,
        Err(_) => dotenv::var(key).unwrap_or_else(|_| default.to_string()),
    }
}

pub static UPLOAD_PATH: Lazy<String> = Lazy::new(|| env_or("SCRIBE_UPLOAD_PATH", UPLOAD_PATH_DEFAULT));
pub static RESULTS_PATH: Lazy<String> = Lazy::new(|| env_or("SCRIBE_RESULTS_PATH", RESULTS_PATH_DEFAULT));
pub static MODEL_PATH: Lazy<String> = Lazy::new(|| env_or("SCRIBE_MODEL_PATH", MODEL_PATH_DEFAULT));
pub static OLLAMA_URL: Lazy<String> = Lazy::new(|| env_or("SCRIBE_OLLAMA_URL", OLLAMA_URL_DEFAULT));
pub static OLLAMA_MODEL: Lazy<String> = Lazy::new(|| env_or("SCRIBE_OLLAMA_MODEL", OLLAMA_MODEL_DEFAULT));
pub static LISTEN_ADDR: Lazy<String> = Lazy::new(|| env_or("SCRIBE_LISTEN_ADDR", LISTEN_ADDR_DEFAULT));

pub fn init_env() {
    dotenv::dotenv().ok();

    for dir in [UPLOAD_PATH.as_str(), RESULTS_PATH.as_str()] {
        std::fs::create_dir_all(dir).unwrap_or_else(|e| {
            eprintln!("Failed to create data directory {}: {}", dir, e);
        });
    }
}
