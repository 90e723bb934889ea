//! Artifact Persistence
//!
//! A [`PersistenceSink`] stores one rendered page plus its metadata under a
//! slug. [`FileSink`] writes `{slug}.html` and `{slug}.json` into a directory;
//! each file goes through a temporary sibling and a rename, so readers never
//! observe a half-written artifact.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::types::LandingPage;
use crate::types::{Result, SeoError};

/// Sidecar metadata stored next to every page
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactMetadata {
    pub slug: String,
    pub url: String,
    pub label: String,
    pub meta_title: String,
    pub meta_description: String,
    pub keywords: Vec<String>,
    pub target_word_count: usize,
    pub generated_at: DateTime<Utc>,
    /// Structured content the HTML was rendered from
    pub page: LandingPage,
}

/// Where a stored artifact ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub id: String,
    pub path: Option<PathBuf>,
}

#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store one rendered page, replacing any previous artifact for `slug`
    async fn store(
        &self,
        slug: &str,
        html: &str,
        metadata: &ArtifactMetadata,
    ) -> Result<StoredArtifact>;

    /// Slugs of every stored page, sorted
    async fn list(&self) -> Result<Vec<String>>;
}

/// Directory-backed sink
///
/// Stores run as one blocking job and are serialized per sink. A store whose
/// caller stops waiting (timeout, cancellation) still runs to the end of its
/// job, then removes everything it wrote.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn html_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.html", slug))
    }

    pub fn metadata_path(&self, slug: &str) -> PathBuf {
        self.dir.join(format!("{}.json", slug))
    }
}

#[async_trait]
impl PersistenceSink for FileSink {
    async fn store(
        &self,
        slug: &str,
        html: &str,
        metadata: &ArtifactMetadata,
    ) -> Result<StoredArtifact> {
        let job = ArtifactJob {
            dir: self.dir.clone(),
            html_path: self.html_path(slug),
            metadata_path: self.metadata_path(slug),
            html: html.to_string(),
            json: serde_json::to_string_pretty(metadata)?,
        };
        let lock = Arc::clone(&self.write_lock);
        let mut waiter = Abandoned::watch();
        let abandoned = waiter.flag();

        let written = tokio::task::spawn_blocking(move || {
            let _held = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            job.run(&abandoned)
        })
        .await;
        waiter.disarm();

        let html_path = written
            .map_err(|e| SeoError::Storage(format!("Write task for '{}' failed: {}", slug, e)))??;

        debug!(slug, path = %html_path.display(), bytes = html.len(), "Stored page");
        Ok(StoredArtifact {
            id: slug.to_string(),
            path: Some(html_path),
        })
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut slugs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("html")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                slugs.push(stem.to_string());
            }
        }
        slugs.sort();
        Ok(slugs)
    }
}

/// Raised when the waiting side of a store is dropped before the job ends
struct Abandoned {
    flag: Arc<AtomicBool>,
    armed: bool,
}

impl Abandoned {
    fn watch() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            armed: true,
        }
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for Abandoned {
    fn drop(&mut self) {
        if self.armed {
            self.flag.store(true, Ordering::SeqCst);
        }
    }
}

/// One page and its sidecar, written under the sink's lock
struct ArtifactJob {
    dir: PathBuf,
    html_path: PathBuf,
    metadata_path: PathBuf,
    html: String,
    json: String,
}

impl ArtifactJob {
    fn run(self, abandoned: &AtomicBool) -> Result<PathBuf> {
        let gone = || abandoned.load(Ordering::SeqCst);
        if gone() {
            return Err(abandoned_error(&self.html_path));
        }

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            SeoError::Storage(format!("Failed to create {}: {}", self.dir.display(), e))
        })?;

        let metadata = StagedFile::write(&self.metadata_path, self.json.as_bytes())?;
        let html = StagedFile::write(&self.html_path, self.html.as_bytes())?;
        if gone() {
            return Err(abandoned_error(&self.html_path));
        }

        // Metadata first: an html file without its sidecar is never listed as done
        metadata.commit()?;
        if let Err(e) = html.commit() {
            remove_quietly(&self.metadata_path);
            return Err(e);
        }

        if gone() {
            remove_quietly(&self.html_path);
            remove_quietly(&self.metadata_path);
            return Err(abandoned_error(&self.html_path));
        }
        Ok(self.html_path)
    }
}

/// Fully written temporary sibling of `target`; removed unless committed
struct StagedFile {
    temp: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl StagedFile {
    fn write(target: &Path, contents: &[u8]) -> Result<Self> {
        let file_name = target.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            SeoError::Storage(format!("Invalid artifact path: {}", target.display()))
        })?;
        let staged = Self {
            temp: target.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4())),
            target: target.to_path_buf(),
            committed: false,
        };

        let written = std::fs::File::create(&staged.temp).and_then(|mut file| {
            file.write_all(contents)?;
            file.sync_all()
        });
        written.map_err(|e| write_error(target, e))?;
        Ok(staged)
    }

    fn commit(mut self) -> Result<()> {
        std::fs::rename(&self.temp, &self.target).map_err(|e| write_error(&self.target, e))?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            remove_quietly(&self.temp);
        }
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path)
        && e.kind() != std::io::ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "Failed to remove partial artifact");
    }
}

fn write_error(path: &Path, e: std::io::Error) -> SeoError {
    SeoError::Storage(format!("Failed to write {}: {}", path.display(), e))
}

fn abandoned_error(path: &Path) -> SeoError {
    SeoError::Storage(format!("Write of {} abandoned by caller", path.display()))
}
