use crate::config::WatchConfig;
use crate::error::{DropWatchError, Result};
use crate::lifecycle::task::{FileTask, TaskOutcome};
use crate::logging::AuditLog;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Separates the original content from text appended on a terminal transition.
pub const TRAILER_SEPARATOR: &str = "\n\n---\n";

/// Moves processed files out of a watched folder into its `completed` or
/// `failed` subdirectory.
///
/// The append and the rename are two separate steps. If the rename fails
/// after the append succeeded, the file keeps the trailer but stays where it
/// was; nothing is rolled back.
#[derive(Clone)]
pub struct FileLifecycle {
    completed_dir: String,
    failed_dir: String,
    logger: AuditLog,
}

impl FileLifecycle {
    pub fn new<C: Into<String>, F: Into<String>>(
        completed_dir: C,
        failed_dir: F,
        logger: AuditLog,
    ) -> Self {
        Self {
            completed_dir: completed_dir.into(),
            failed_dir: failed_dir.into(),
            logger,
        }
    }

    pub fn from_config(config: &WatchConfig, logger: AuditLog) -> Self {
        Self::new(config.completed_dir.clone(), config.failed_dir.clone(), logger)
    }

    pub fn subdirectory(&self, outcome: TaskOutcome) -> &str {
        match outcome {
            TaskOutcome::Completed => &self.completed_dir,
            TaskOutcome::Failed => &self.failed_dir,
        }
    }

    pub async fn complete(
        &self,
        plugin_name: &str,
        full_path: &Path,
        append_text: &str,
    ) -> Result<PathBuf> {
        self.transition(TaskOutcome::Completed, plugin_name, full_path, append_text)
            .await
    }

    pub async fn fail(
        &self,
        plugin_name: &str,
        full_path: &Path,
        append_text: &str,
    ) -> Result<PathBuf> {
        self.transition(TaskOutcome::Failed, plugin_name, full_path, append_text)
            .await
    }

    async fn transition(
        &self,
        outcome: TaskOutcome,
        plugin_name: &str,
        full_path: &Path,
        append_text: &str,
    ) -> Result<PathBuf> {
        if full_path.as_os_str().is_empty() {
            return Err(DropWatchError::invalid_argument(format!(
                "File path is required to mark {}",
                outcome
            )));
        }
        if plugin_name.trim().is_empty() {
            return Err(DropWatchError::invalid_argument(format!(
                "A plugin name is required to mark {}",
                outcome
            )));
        }

        let trailer = append_text.trim();
        if !trailer.is_empty() {
            self.logger
                .record(
                    plugin_name,
                    &format!(
                        "Modifying {} before marking {}.",
                        full_path.display(),
                        outcome
                    ),
                )
                .await;
            append_trailer(full_path, trailer).await?;
        }

        let task = FileTask::from_path(full_path);
        let timestamp = chrono::Utc::now().timestamp();
        let destination = task.terminal_path(self.subdirectory(outcome), timestamp);

        fs::rename(&task.full_path, &destination)
            .await
            .map_err(|source| DropWatchError::Lifecycle {
                path: task.full_path.clone(),
                source,
            })?;

        self.logger
            .record(
                plugin_name,
                &format!(
                    "Moved {} to {}.",
                    task.full_path.display(),
                    destination.display()
                ),
            )
            .await;

        Ok(destination)
    }
}

async fn append_trailer(path: &Path, trailer: &str) -> Result<()> {
    let lifecycle_error = |source| DropWatchError::Lifecycle {
        path: path.to_path_buf(),
        source,
    };

    // No `create`: a file that is already gone must not be recreated empty.
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(lifecycle_error)?;

    file.write_all(format!("{}{}", TRAILER_SEPARATOR, trailer).as_bytes())
        .await
        .map_err(lifecycle_error)?;
    file.flush().await.map_err(lifecycle_error)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        folder: PathBuf,
        lifecycle: FileLifecycle,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let folder = temp_dir.path().join("inbox");
        std_fs::create_dir_all(folder.join("completed")).unwrap();
        std_fs::create_dir_all(folder.join("failed")).unwrap();

        let logger = AuditLog::new(temp_dir.path().join("logs"));
        std_fs::create_dir_all(logger.directory()).unwrap();

        Fixture {
            lifecycle: FileLifecycle::new("completed", "failed", logger),
            folder,
            _temp_dir: temp_dir,
        }
    }

    fn only_entry(dir: &Path) -> PathBuf {
        let entries: Vec<PathBuf> = std_fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(entries.len(), 1, "expected exactly one file in {}", dir.display());
        entries.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_complete_moves_without_altering_content() {
        let fx = fixture();
        let source = fx.folder.join("drop.txt");
        std_fs::write(&source, "User: alice\n\nHello").unwrap();

        let before = chrono::Utc::now().timestamp();
        let destination = fx.lifecycle.complete("example", &source, "").await.unwrap();
        let after = chrono::Utc::now().timestamp();

        assert!(!source.exists());
        assert_eq!(destination.parent().unwrap(), fx.folder.join("completed"));
        assert_eq!(only_entry(&fx.folder.join("completed")), destination);

        let file_name = destination.file_name().unwrap().to_string_lossy().to_string();
        let stamp: i64 = file_name
            .strip_prefix("drop_")
            .and_then(|rest| rest.strip_suffix(".txt"))
            .unwrap()
            .parse()
            .unwrap();
        assert!(stamp >= before && stamp <= after);

        assert_eq!(std_fs::read_to_string(&destination).unwrap(), "User: alice\n\nHello");
    }

    #[tokio::test]
    async fn test_whitespace_only_text_is_not_appended() {
        let fx = fixture();
        let source = fx.folder.join("quiet.md");
        std_fs::write(&source, "body").unwrap();

        let destination = fx.lifecycle.complete("example", &source, "  \n\t ").await.unwrap();
        assert_eq!(std_fs::read_to_string(destination).unwrap(), "body");
    }

    #[tokio::test]
    async fn test_fail_appends_trimmed_trailer() {
        let fx = fixture();
        let source = fx.folder.join("drop.txt");
        std_fs::write(&source, "Topic: alerts\n\nbody").unwrap();

        let destination = fx
            .lifecycle
            .fail("ntfy", &source, "\n  Unable to process. connection refused  \n")
            .await
            .unwrap();

        assert_eq!(destination.parent().unwrap(), fx.folder.join("failed"));
        let content = std_fs::read_to_string(&destination).unwrap();
        assert_eq!(
            content,
            "Topic: alerts\n\nbody\n\n---\nUnable to process. connection refused"
        );

        let log = std_fs::read_to_string(fx.lifecycle.logger.log_file("ntfy")).unwrap();
        assert!(log.contains("before marking failed."));
        assert!(log.contains("Moved "));
    }

    #[tokio::test]
    async fn test_second_complete_fails() {
        let fx = fixture();
        let source = fx.folder.join("once.txt");
        std_fs::write(&source, "x").unwrap();

        fx.lifecycle.complete("example", &source, "").await.unwrap();
        let second = fx.lifecycle.complete("example", &source, "").await;

        assert!(matches!(second, Err(DropWatchError::Lifecycle { .. })));
    }

    #[tokio::test]
    async fn test_missing_file_with_trailer_is_not_recreated() {
        let fx = fixture();
        let source = fx.folder.join("ghost.txt");

        let result = fx.lifecycle.fail("example", &source, "diagnostics").await;

        assert!(matches!(result, Err(DropWatchError::Lifecycle { .. })));
        assert!(!source.exists());
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_appended_text() {
        let fx = fixture();
        std_fs::remove_dir(fx.folder.join("failed")).unwrap();
        let source = fx.folder.join("stuck.txt");
        std_fs::write(&source, "payload").unwrap();

        let result = fx.lifecycle.fail("example", &source, "reason").await;

        assert!(matches!(result, Err(DropWatchError::Lifecycle { .. })));
        assert_eq!(
            std_fs::read_to_string(&source).unwrap(),
            "payload\n\n---\nreason"
        );
    }

    #[tokio::test]
    async fn test_empty_path_is_invalid_argument() {
        let fx = fixture();
        let result = fx.lifecycle.complete("example", Path::new(""), "").await;
        assert!(matches!(result, Err(DropWatchError::InvalidArgument { .. })));
    }

    #[tokio::test]
    async fn test_empty_plugin_name_is_invalid_argument() {
        let fx = fixture();
        let source = fx.folder.join("drop.txt");
        std_fs::write(&source, "x").unwrap();

        let result = fx.lifecycle.fail(" ", &source, "nope").await;
        assert!(matches!(result, Err(DropWatchError::InvalidArgument { .. })));
        assert_eq!(std_fs::read_to_string(&source).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_unwritable_log_does_not_block_the_move() {
        let temp_dir = TempDir::new().unwrap();
        std_fs::create_dir_all(temp_dir.path().join("failed")).unwrap();
        let logger = AuditLog::new(temp_dir.path().join("no-such-dir"));
        let lifecycle = FileLifecycle::new("completed", "failed", logger);

        let source = temp_dir.path().join("drop.txt");
        std_fs::write(&source, "body").unwrap();

        let destination = lifecycle.fail("example", &source, "reason").await.unwrap();
        assert!(!source.exists());
        assert_eq!(
            std_fs::read_to_string(destination).unwrap(),
            "body\n\n---\nreason"
        );
    }

    #[tokio::test]
    async fn test_custom_subdirectory_names() {
        let temp_dir = TempDir::new().unwrap();
        std_fs::create_dir_all(temp_dir.path().join("done")).unwrap();
        let logger = AuditLog::new(temp_dir.path());
        let lifecycle = FileLifecycle::new("done", "broken", logger);

        let source = temp_dir.path().join("a.csv");
        std_fs::write(&source, "1,2").unwrap();

        let destination = lifecycle.complete("example", &source, "").await.unwrap();
        assert_eq!(destination.parent().unwrap(), temp_dir.path().join("done"));
        assert_eq!(lifecycle.subdirectory(TaskOutcome::Failed), "broken");
    }
}
