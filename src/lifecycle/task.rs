use std::fmt;
use std::path::{Path, PathBuf};

/// A dropped file, described by where it sat when it was detected.
///
/// The file itself is the unit of work: its directory tells whether it is
/// still pending or has reached a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTask {
    pub full_path: PathBuf,
    pub dir: PathBuf,
    pub basename: String,
    pub name: String,
    pub extension: String,
}

impl FileTask {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let full_path = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());

        let basename = full_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let name = full_path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let extension = full_path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let dir = full_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Self {
            full_path,
            dir,
            basename,
            name,
            extension,
        }
    }

    /// `<dir>/<subdir>/<name>_<timestamp>.<ext>` with the original extension casing.
    pub fn terminal_path(&self, subdir: &str, timestamp: i64) -> PathBuf {
        let file_name = match self.full_path.extension() {
            Some(ext) => format!("{}_{}.{}", self.name, timestamp, ext.to_string_lossy()),
            None => format!("{}_{}", self.name, timestamp),
        };

        self.dir.join(subdir).join(file_name)
    }
}

impl fmt::Display for FileTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path.display())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed,
}

impl TaskOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskOutcome::Completed => "completed",
            TaskOutcome::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
