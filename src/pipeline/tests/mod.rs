use super::*;
use crate::asr::AsrEngine;
use crate::store::ArtifactStore;
use crate::summarize::Summarizer;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{Notify, Semaphore};
use tokio::time::sleep;
use uuid::Uuid;

struct MockAsr {
    fail: bool,
}

#[async_trait]
impl AsrEngine for MockAsr {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        if self.fail {
            return Err(anyhow::anyhow!("inference engine unavailable"));
        }
        Ok(format!("transcript of {}", audio.display()))
    }
}

struct MockSummarizer {
    fail: bool,
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String> {
        if self.fail {
            return Err(anyhow::anyhow!("summarizer unavailable"));
        }
        Ok(format!("summary: {}", &transcript[..transcript.len().min(16)]))
    }
}

/// Records how many transcriptions run at once; the single-consumer design
/// must never let this exceed one.
struct CountingAsr {
    in_flight: AtomicUsize,
    max_seen: AtomicUsize,
}

#[async_trait]
impl AsrEngine for CountingAsr {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_seen.fetch_max(now, Ordering::SeqCst);
        sleep(Duration::from_millis(10)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok("text".to_string())
    }
}

/// Signals when transcription starts and holds it until released, so a test
/// can observe the mid-processing state deterministically.
struct GatedAsr {
    started: Arc<Notify>,
    release: Arc<Semaphore>,
}

#[async_trait]
impl AsrEngine for GatedAsr {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        self.started.notify_one();
        let permit = self.release.acquire().await?;
        permit.forget();
        Ok("gated text".to_string())
    }
}

struct TestEnv {
    store: Arc<ArtifactStore>,
    registry: Arc<TaskRegistry>,
    queue: Arc<WorkQueue>,
    reconciler: Arc<StatusReconciler>,
    _dir: TempDir,
}

fn setup_env() -> TestEnv {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(
        ArtifactStore::new(dir.path().join("uploads"), dir.path().join("results")).unwrap(),
    );
    let registry = Arc::new(TaskRegistry::new());
    let queue = Arc::new(WorkQueue::new());
    let reconciler = Arc::new(StatusReconciler::new(store.clone(), registry.clone()));
    TestEnv {
        store,
        registry,
        queue,
        reconciler,
        _dir: dir,
    }
}

fn spawn_worker(env: &TestEnv, asr: Arc<dyn AsrEngine>, summarizer: Arc<dyn Summarizer>) {
    let worker = Arc::new(TaskWorker::new(
        env.registry.clone(),
        env.queue.clone(),
        env.store.clone(),
        asr,
        summarizer,
    ));
    tokio::spawn(async move { worker.run().await });
}

/// Admission as the upload handler does it: durable blob first, then the
/// queued registry entry, then the queue push.
async fn admit(env: &TestEnv, filename: &str) -> String {
    let task_id = Uuid::new_v4().to_string();
    let audio_path = env.store.save_upload(&task_id, filename, b"RIFFdata").unwrap();
    env.registry.set(&task_id, Lifecycle::Queued).await;
    env.queue
        .enqueue(TaskDescriptor {
            id: task_id.clone(),
            original_filename: filename.to_string(),
            audio_path,
            created_at: Utc::now(),
        })
        .unwrap();
    task_id
}

async fn wait_until<F, Fut>(mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return true;
        }
        sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn complete_task_lifecycle() {
    let env = setup_env();
    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: false }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let task_id = admit(&env, "meeting.wav").await;

    let done = wait_until(|| {
        let reconciler = env.reconciler.clone();
        let task_id = task_id.clone();
        async move { reconciler.resolve(&task_id).await == Lifecycle::Done }
    })
    .await;
    assert!(done, "task should reach done");

    let outcome = env.reconciler.result(&task_id).await.unwrap().unwrap();
    assert!(outcome.transcript.starts_with("transcript of"));
    assert!(outcome.summary.starts_with("summary:"));
}

#[tokio::test]
async fn result_is_pending_until_artifact_then_done_forever() {
    let env = setup_env();

    // No worker yet: admitted but unprocessed tasks stay pending.
    let task_id = admit(&env, "talk.wav").await;
    assert!(env.reconciler.result(&task_id).await.unwrap().is_none());
    assert_eq!(env.reconciler.resolve(&task_id).await, Lifecycle::Queued);

    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: false }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let done = wait_until(|| {
        let reconciler = env.reconciler.clone();
        let task_id = task_id.clone();
        async move { reconciler.result(&task_id).await.unwrap().is_some() }
    })
    .await;
    assert!(done);

    // Monotonic: once done, repeated reads stay done.
    for _ in 0..3 {
        assert!(env.reconciler.result(&task_id).await.unwrap().is_some());
        assert_eq!(env.reconciler.resolve(&task_id).await, Lifecycle::Done);
    }
}

#[tokio::test]
async fn transcription_failure_keeps_error_state_and_marker() {
    let env = setup_env();
    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: true }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let task_id = admit(&env, "broken.wav").await;

    let errored = wait_until(|| {
        let registry = env.registry.clone();
        let task_id = task_id.clone();
        async move { registry.get(&task_id).await == Some(Lifecycle::Error) }
    })
    .await;
    assert!(errored, "registry should record the error");

    // The attempt completed, so the artifact exists and carries the marker.
    let transcript = env.store.read_transcript(&task_id).unwrap().unwrap();
    assert!(transcript.starts_with(ERROR_MARKER));

    // A failed transcription never produces a summary.
    assert_eq!(env.store.read_summary(&task_id).unwrap(), None);

    // The durable tier reports done; the error stays visible only through
    // the warm registry and transcript content.
    assert_eq!(env.reconciler.resolve(&task_id).await, Lifecycle::Done);
    assert_eq!(env.registry.get(&task_id).await, Some(Lifecycle::Error));
}

#[tokio::test]
async fn summarization_failure_is_absorbed() {
    let env = setup_env();
    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: false }),
        Arc::new(MockSummarizer { fail: true }),
    );

    let task_id = admit(&env, "no-summary.wav").await;

    let done = wait_until(|| {
        let registry = env.registry.clone();
        let task_id = task_id.clone();
        async move { registry.get(&task_id).await == Some(Lifecycle::Done) }
    })
    .await;
    assert!(done, "summarizer failure must not fail the task");

    let outcome = env.reconciler.result(&task_id).await.unwrap().unwrap();
    assert!(outcome.transcript.starts_with("transcript of"));
    assert_eq!(outcome.summary, "");
    assert_eq!(env.store.read_summary(&task_id).unwrap(), None);
}

#[tokio::test]
async fn restart_recovers_done_tasks_from_artifacts() {
    let env = setup_env();
    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: false }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let task_id = admit(&env, "before-crash.wav").await;
    let done = wait_until(|| {
        let reconciler = env.reconciler.clone();
        let task_id = task_id.clone();
        async move { reconciler.resolve(&task_id).await == Lifecycle::Done }
    })
    .await;
    assert!(done);

    // Simulated restart: fresh registry and reconciler, intact store.
    let cold_registry = Arc::new(TaskRegistry::new());
    let cold_reconciler = StatusReconciler::new(env.store.clone(), cold_registry.clone());

    assert_eq!(cold_reconciler.resolve(&task_id).await, Lifecycle::Done);
    let outcome = cold_reconciler.result(&task_id).await.unwrap().unwrap();
    assert!(outcome.transcript.starts_with("transcript of"));

    // The observed done was written back to warm the cold cache.
    assert_eq!(cold_registry.get(&task_id).await, Some(Lifecycle::Done));
}

#[tokio::test]
async fn restart_reports_unprocessed_tasks_as_queued() {
    let env = setup_env();

    // Blob stored, but the queue died with the old process.
    let task_id = Uuid::new_v4().to_string();
    env.store.save_upload(&task_id, "lost.wav", b"RIFF").unwrap();

    assert_eq!(env.reconciler.resolve(&task_id).await, Lifecycle::Queued);
    assert!(env.reconciler.result(&task_id).await.unwrap().is_none());

    // And the history listing shows it, still queued.
    let history = env.reconciler.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, task_id);
    assert_eq!(history[0].status, Lifecycle::Queued);
}

#[tokio::test]
async fn history_is_sorted_newest_first() {
    let env = setup_env();

    let first = admit(&env, "first.wav").await;
    sleep(Duration::from_millis(25)).await;
    let second = admit(&env, "second.wav").await;

    // No worker running: both still queued, newest first.
    let history = env.reconciler.history().await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, second);
    assert_eq!(history[1].id, first);
    assert!(history.iter().all(|e| e.status == Lifecycle::Queued));
    assert!(history.iter().all(|e| e.transcript.is_none()));
}

#[tokio::test]
async fn history_joins_artifacts_for_done_tasks() {
    let env = setup_env();
    spawn_worker(
        &env,
        Arc::new(MockAsr { fail: false }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let task_id = admit(&env, "joined.wav").await;
    let done = wait_until(|| {
        let reconciler = env.reconciler.clone();
        let task_id = task_id.clone();
        async move { reconciler.resolve(&task_id).await == Lifecycle::Done }
    })
    .await;
    assert!(done);

    let history = env.reconciler.history().await.unwrap();
    let entry = history.iter().find(|e| e.id == task_id).unwrap();
    assert_eq!(entry.status, Lifecycle::Done);
    assert_eq!(entry.filename, "joined.wav");
    assert!(entry.transcript.as_deref().unwrap().starts_with("transcript of"));
    assert!(entry.summary.as_deref().unwrap().starts_with("summary:"));
    assert_eq!(entry.audio_url, format!("/audio/{}", task_id));
}

#[tokio::test]
async fn at_most_one_task_processing_at_a_time() {
    let env = setup_env();
    let asr = Arc::new(CountingAsr {
        in_flight: AtomicUsize::new(0),
        max_seen: AtomicUsize::new(0),
    });
    spawn_worker(&env, asr.clone(), Arc::new(MockSummarizer { fail: false }));

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(admit(&env, &format!("clip{}.wav", i)).await);
    }

    let all_done = wait_until(|| {
        let registry = env.registry.clone();
        let ids = ids.clone();
        async move {
            for id in &ids {
                if registry.get(id).await != Some(Lifecycle::Done) {
                    return false;
                }
            }
            true
        }
    })
    .await;
    assert!(all_done);
    assert_eq!(asr.max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn current_pointer_tracks_processing_and_clears_when_idle() {
    let env = setup_env();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Semaphore::new(0));
    spawn_worker(
        &env,
        Arc::new(GatedAsr {
            started: started.clone(),
            release: release.clone(),
        }),
        Arc::new(MockSummarizer { fail: false }),
    );

    let task_id = admit(&env, "meeting.wav").await;
    started.notified().await;

    let current = env.registry.current().await.unwrap();
    assert_eq!(current.id, task_id);
    assert_eq!(current.file, "meeting.wav");
    assert_eq!(env.reconciler.resolve(&task_id).await, Lifecycle::Processing);

    release.add_permits(1);
    let cleared = wait_until(|| {
        let registry = env.registry.clone();
        async move { registry.current().await.is_none() }
    })
    .await;
    assert!(cleared, "pointer clears once the queue drains");
    assert_eq!(env.registry.get(&task_id).await, Some(Lifecycle::Done));
}
