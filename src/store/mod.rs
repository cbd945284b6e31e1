use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

/// One uploaded blob, recovered from the upload namespace. The
/// `{task_id}_{original_filename}` naming is the join key the reconciler uses
/// to rebuild status after a restart; it must not change.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    pub task_id: String,
    pub original_filename: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

/// Filesystem-backed store for uploaded audio and derived text artifacts.
/// This is the durable source of truth; everything in memory is a cache over
/// it. All writes go through a temp file and an atomic rename so a reader can
/// never observe a partially written artifact.
pub struct ArtifactStore {
    upload_dir: PathBuf,
    results_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(upload_dir: impl Into<PathBuf>, results_dir: impl Into<PathBuf>) -> Result<Self> {
        let upload_dir = upload_dir.into();
        let results_dir = results_dir.into();
        fs::create_dir_all(&upload_dir)
            .with_context(|| format!("Failed to create upload directory {:?}", upload_dir))?;
        fs::create_dir_all(&results_dir)
            .with_context(|| format!("Failed to create results directory {:?}", results_dir))?;
        Ok(Self { upload_dir, results_dir })
    }

    pub fn save_upload(&self, task_id: &str, original_filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let filename = sanitize_filename(original_filename);
        let dest = self.upload_dir.join(format!("{}_{}", task_id, filename));
        self.write_atomic(&dest, bytes)?;
        Ok(dest)
    }

    pub fn write_transcript(&self, task_id: &str, text: &str) -> Result<()> {
        self.write_atomic(&self.transcript_path(task_id), text.as_bytes())
    }

    pub fn write_summary(&self, task_id: &str, text: &str) -> Result<()> {
        self.write_atomic(&self.summary_path(task_id), text.as_bytes())
    }

    /// Transcript existence is the single authoritative signal for a task
    /// having completed; the reconciler consults this before the registry.
    pub fn has_transcript(&self, task_id: &str) -> bool {
        self.transcript_path(task_id).exists()
    }

    pub fn read_transcript(&self, task_id: &str) -> Result<Option<String>> {
        self.read_optional(&self.transcript_path(task_id))
    }

    pub fn read_summary(&self, task_id: &str) -> Result<Option<String>> {
        self.read_optional(&self.summary_path(task_id))
    }

    /// Locates the uploaded blob for a task by its id prefix.
    pub fn find_audio(&self, task_id: &str) -> Result<Option<PathBuf>> {
        let prefix = format!("{}_", task_id);
        for entry in fs::read_dir(&self.upload_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    /// Enumerates the upload namespace. Entries that do not follow the
    /// `{task_id}_{original_filename}` scheme are skipped, not errors.
    pub fn list_uploads(&self) -> Result<Vec<UploadRecord>> {
        let mut records = Vec::new();

        for entry in fs::read_dir(&self.upload_dir)? {
            let entry = entry?;
            let filename = entry.file_name().to_string_lossy().to_string();
            let Some((task_id, original_filename)) = filename.split_once('_') else {
                continue;
            };
            if task_id.is_empty() || original_filename.is_empty() {
                continue;
            }

            let metadata = entry.metadata()?;
            let created = metadata.created().or_else(|_| metadata.modified())?;

            records.push(UploadRecord {
                task_id: task_id.to_string(),
                original_filename: original_filename.to_string(),
                path: entry.path(),
                created_at: DateTime::<Utc>::from(created),
            });
        }

        Ok(records)
    }

    fn transcript_path(&self, task_id: &str) -> PathBuf {
        self.results_dir.join(format!("{}.txt", task_id))
    }

    fn summary_path(&self, task_id: &str) -> PathBuf {
        self.results_dir.join(format!("{}_summary.txt", task_id))
    }

    fn read_optional(&self, path: &Path) -> Result<Option<String>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read artifact {:?}", path))?;
        Ok(Some(text))
    }

    fn write_atomic(&self, dest: &Path, bytes: &[u8]) -> Result<()> {
        let dir = dest
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Artifact path {:?} has no parent directory", dest))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("Failed to create temp file in {:?}", dir))?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(dest)
            .with_context(|| format!("Failed to persist artifact {:?}", dest))?;
        Ok(())
    }
}

/// Keeps only the final path component of a user-supplied filename so an
/// upload can never escape the store directory.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if base.is_empty() {
        warn!("Upload had an unusable filename {:?}, storing as 'audio'", name);
        return "audio".to_string();
    }
    base
}
