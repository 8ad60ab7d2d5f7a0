//! Local model cache
//!
//! Cache structure:
//! ```text
//! <cache root>/
//! ├── core/
//! │   ├── ep_model.rds
//! │   └── wp_model.rds
//! └── stat-models/
//!     ├── goals.rds
//!     └── tackles.rds
//! ```
//!
//! There is no manifest: presence is a filesystem existence check.
//! `.part` and `.download` files beside an entry belong to a download in
//! progress (or one that was interrupted) and are not cache entries.

use super::download::STAGING_SUFFIXES;
use super::resolver::ModelCategory;
use crate::error::{ModelError, ModelResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which part of the cache a clear operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    All,
    Core,
    Stat,
}

impl CacheScope {
    pub fn categories(&self) -> &'static [ModelCategory] {
        match self {
            Self::All => &ModelCategory::ALL,
            Self::Core => &[ModelCategory::Core],
            Self::Stat => &[ModelCategory::Stat],
        }
    }
}

impl FromStr for CacheScope {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "core" => Ok(Self::Core),
            "stat" => Ok(Self::Stat),
            other => Err(ModelError::InvalidScope {
                scope: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CacheScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Core => write!(f, "core"),
            Self::Stat => write!(f, "stat"),
        }
    }
}

/// A file present in the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Filesystem view of the cache root
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: ModelCategory) -> PathBuf {
        self.root.join(category.cache_subdir())
    }

    /// Path of a cached file. Pure; never touches the filesystem.
    pub fn path_for(&self, category: ModelCategory, filename: &str) -> PathBuf {
        self.category_dir(category).join(filename)
    }

    /// Path of a cached file, creating the category directory so it can be written
    pub fn prepare_path(&self, category: ModelCategory, filename: &str) -> ModelResult<PathBuf> {
        let dir = self.category_dir(category);
        std::fs::create_dir_all(&dir).map_err(|e| ModelError::io(&dir, e))?;
        Ok(dir.join(filename))
    }

    /// Look up a cached file, returning `None` if it is absent
    pub fn entry(&self, category: ModelCategory, filename: &str) -> Option<CacheEntry> {
        let path = self.path_for(category, filename);
        entry_at(&path)
    }

    /// Cached model filenames under a category directory, sorted
    ///
    /// A missing directory yields an empty list. Staging files are skipped.
    /// An unreadable directory is logged and treated as empty.
    pub fn list(&self, category: ModelCategory) -> Vec<String> {
        match self.files_in(category) {
            Ok(files) => files.into_iter().filter(|f| !is_staging_file(f)).collect(),
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Failed to list cache directory");
                Vec::new()
            }
        }
    }

    /// Every regular file directly under a category directory, sorted
    fn files_in(&self, category: ModelCategory) -> ModelResult<Vec<String>> {
        let dir = self.category_dir(category);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ModelError::io(&dir, e)),
        };

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ModelError::io(&dir, e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| ModelError::io(entry.path(), e))?;
            if file_type.is_file() {
                files.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        files.sort();
        Ok(files)
    }

    /// Delete a single cached file. Missing files are not an error.
    pub fn remove(&self, path: &Path) -> ModelResult<bool> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ModelError::io(path, e)),
        }
    }

    /// Delete every file directly inside the scope's category directories
    ///
    /// Leftover staging files are removed too. The directories themselves are
    /// kept. Returns the number of files removed.
    pub fn clear(&self, scope: CacheScope) -> ModelResult<usize> {
        let mut removed = 0;

        for category in scope.categories() {
            let dir = self.category_dir(*category);
            for filename in self.files_in(*category)? {
                if self.remove(&dir.join(&filename))? {
                    removed += 1;
                }
            }
            tracing::debug!(category = %category, dir = ?dir, "Cleared cache category");
        }

        Ok(removed)
    }
}

fn is_staging_file(filename: &str) -> bool {
    STAGING_SUFFIXES
        .iter()
        .any(|suffix| filename.ends_with(suffix))
}

fn entry_at(path: &Path) -> Option<CacheEntry> {
    let metadata = std::fs::metadata(path).ok()?;
    if !metadata.is_file() {
        return None;
    }

    Some(CacheEntry {
        path: path.to_path_buf(),
        size_bytes: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
    })
}

/// Bytes to megabytes, rounded to two decimals
pub fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
}
