//! What every file handler implements, and the shared services it gets.
//!
//! A conforming plugin:
//!
//! - reads the file itself (only the path is passed in);
//! - calls exactly one of [`PluginContext::complete`] or
//!   [`PluginContext::fail`] on every path through its logic, so the file
//!   always leaves the watched folder;
//! - turns its own errors into a `fail` call carrying diagnostic text.
//!
//! None of this is enforced. A plugin that returns `Err` without a terminal
//! call leaves the file pending; the dispatcher only logs the error.

use crate::error::Result;
use crate::lifecycle::FileLifecycle;
use crate::logging::AuditLog;
use crate::metadata::{self, ExtractedContent};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

#[async_trait]
pub trait FilePlugin: Send + Sync {
    /// Name used for the plugin's log file and configuration table.
    fn name(&self) -> &str;

    async fn process(&self, ctx: &PluginContext, path: &Path) -> Result<()>;
}

#[derive(Clone)]
pub struct PluginContext {
    lifecycle: FileLifecycle,
    logger: AuditLog,
}

impl PluginContext {
    pub fn new(lifecycle: FileLifecycle, logger: AuditLog) -> Self {
        Self { lifecycle, logger }
    }

    pub fn lifecycle(&self) -> &FileLifecycle {
        &self.lifecycle
    }

    pub fn logger(&self) -> &AuditLog {
        &self.logger
    }

    /// Audit log entry for the plugin. A failed write is reported on the
    /// console and never stops the file from reaching a terminal folder.
    pub async fn log(&self, plugin_name: &str, message: &str) {
        self.logger.record(plugin_name, message).await
    }

    pub async fn read_to_string(&self, path: &Path) -> Result<String> {
        Ok(tokio::fs::read_to_string(path).await?)
    }

    /// Read the file and split it into its metadata header and body.
    pub async fn read_metadata(&self, path: &Path) -> Result<ExtractedContent> {
        let content = self.read_to_string(path).await?;
        Ok(metadata::extract(&content))
    }

    pub async fn complete(&self, plugin_name: &str, path: &Path, text: &str) -> Result<PathBuf> {
        self.lifecycle.complete(plugin_name, path, text).await
    }

    pub async fn fail(&self, plugin_name: &str, path: &Path, text: &str) -> Result<PathBuf> {
        self.lifecycle.fail(plugin_name, path, text).await
    }
}
