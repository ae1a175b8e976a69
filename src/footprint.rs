//! Footprint store - durable per-key "last touched" markers
//!
//! One file per key; the file mtime is the marker. Used both for the
//! process liveness heartbeat and for per-channel notification debounce,
//! so the markers survive process restarts.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

/// Per-key last-touched marker store
pub trait FootprintStore {
    /// Time since the key was last updated, `None` if it never was
    fn elapsed(&self, key: &str) -> Result<Option<Duration>>;

    /// Mark the key as touched now
    fn update(&self, key: &str) -> Result<()>;

    /// Forget the key
    fn clear(&self, key: &str) -> Result<()>;
}

/// File-backed store: one marker file per key under a data directory
pub struct FileFootprintStore {
    dir: PathBuf,
}

impl FileFootprintStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create footprint dir: {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.touch"))
    }
}

impl FootprintStore for FileFootprintStore {
    fn elapsed(&self, key: &str) -> Result<Option<Duration>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }

        let mtime = fs::metadata(&path)
            .and_then(|m| m.modified())
            .with_context(|| format!("Failed to stat footprint: {}", path.display()))?;

        // A marker from the future (clock step) reads as just-touched
        let elapsed = SystemTime::now()
            .duration_since(mtime)
            .unwrap_or(Duration::ZERO);

        Ok(Some(elapsed))
    }

    fn update(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        fs::write(&path, chrono::Utc::now().to_rfc3339())
            .with_context(|| format!("Failed to update footprint: {}", path.display()))?;
        Ok(())
    }

    fn clear(&self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to clear footprint: {}", path.display()))?;
        }
        Ok(())
    }
}
