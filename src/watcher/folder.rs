use crate::error::{DropWatchError, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A drop folder plus its two terminal subdirectories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedFolder {
    path: PathBuf,
    completed: PathBuf,
    failed: PathBuf,
}

impl WatchedFolder {
    /// Create the folder and both subdirectories if missing, then resolve the
    /// folder to its canonical absolute path.
    pub fn prepare<P: AsRef<Path>>(path: P, completed_dir: &str, failed_dir: &str) -> Result<Self> {
        let path = path.as_ref();
        let prepare_error = |e: std::io::Error| DropWatchError::Configuration {
            message: format!("Unable to prepare watch folder {}: {}", path.display(), e),
        };

        std::fs::create_dir_all(path).map_err(prepare_error)?;
        let path = path.canonicalize().map_err(prepare_error)?;

        let completed = path.join(completed_dir);
        let failed = path.join(failed_dir);
        std::fs::create_dir_all(&completed).map_err(prepare_error)?;
        std::fs::create_dir_all(&failed).map_err(prepare_error)?;

        Ok(Self {
            path,
            completed,
            failed,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn completed_dir(&self) -> &Path {
        &self.completed
    }

    pub fn failed_dir(&self) -> &Path {
        &self.failed
    }

    /// True when `candidate` sits directly inside this folder.
    pub fn contains(&self, candidate: &Path) -> bool {
        candidate.parent() == Some(self.path.as_path())
    }

    /// Regular files already sitting in the folder (depth 1 only), sorted by path.
    pub fn existing_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        files.sort();
        files
    }
}

impl fmt::Display for WatchedFolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Basename patterns that are never dispatched (editor swap files, partial downloads).
#[derive(Debug, Clone, Default)]
pub struct IgnoreFilter {
    patterns: Vec<Regex>,
}

impl IgnoreFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn is_ignored(&self, basename: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(basename))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
