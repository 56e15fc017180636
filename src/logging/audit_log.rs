use crate::error::{DropWatchError, Result};
use crate::ui::OutputFormatter;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

pub const LOG_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Append-only audit trail, one `<name>.log` file per plugin or component.
///
/// Every entry is also echoed to the console as `[name] message`.
#[derive(Clone)]
pub struct AuditLog {
    directory: PathBuf,
    console: Option<Arc<OutputFormatter>>,
}

impl AuditLog {
    pub fn new<P: Into<PathBuf>>(directory: P) -> Self {
        Self {
            directory: directory.into(),
            console: None,
        }
    }

    pub fn with_console(mut self, formatter: Arc<OutputFormatter>) -> Self {
        self.console = Some(formatter);
        self
    }

    /// Create the log directory if it does not exist yet.
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.directory).await?;
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn log_file(&self, name: &str) -> PathBuf {
        self.directory.join(format!("{}.log", name))
    }

    pub async fn log(&self, name: &str, message: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DropWatchError::invalid_argument(
                "A plugin or component name is required for logging",
            ));
        }

        if let Some(ref console) = self.console {
            console.plugin_line(name, message);
        }

        let timestamp = chrono::Local::now().format(LOG_TIMESTAMP_FORMAT);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.log_file(name))
            .await?;

        file.write_all(format!("\n[{}] {}", timestamp, message).as_bytes())
            .await?;
        file.flush().await?;

        Ok(())
    }

    /// Like [`AuditLog::log`], for callers that have nowhere to propagate a
    /// write failure. The failure goes to the console instead.
    pub async fn record(&self, name: &str, message: &str) {
        if let Err(e) = self.log(name, message).await {
            match self.console {
                Some(ref console) => {
                    console.error(&format!("Unable to write {} log: {}", name, e))
                }
                None => eprintln!("Unable to write {} log: {}", name, e),
            }
        }
    }
}
