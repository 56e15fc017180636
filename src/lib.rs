pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod metadata;
pub mod plugins;
pub mod ui;
pub mod watcher;

// Public API re-exports
pub use cli::{Cli, OutputFormat};
pub use config::{CliOverrides, Config, DispatchConfig, PluginConfig, WatchConfig};
pub use error::{DropWatchError, Result, UserFriendlyError};

// Core functionality re-exports
pub use lifecycle::{FileLifecycle, FileTask, TaskOutcome, TRAILER_SEPARATOR};
pub use logging::AuditLog;
pub use metadata::{extract, ExtractedContent};
pub use plugins::{FilePlugin, PluginContext, PluginRegistry, PluginRegistryBuilder};
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode};
pub use watcher::{DispatchCounts, DispatchOutcome, SessionReport, WatchDispatcher};

use std::path::Path;
use std::sync::Arc;

/// Main library interface: owns the configuration, console and Ctrl+C handling.
pub struct DropWatch {
    config: Config,
    output_formatter: Arc<OutputFormatter>,
    shutdown: GracefulShutdown,
}

impl DropWatch {
    /// Create a new DropWatch instance and install the Ctrl+C handler
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        Ok(Self {
            config,
            output_formatter: Arc::new(OutputFormatter::new(output_mode, verbose, quiet)),
            shutdown: GracefulShutdown::new()?,
        })
    }

    /// Create a DropWatch instance without registering a signal handler
    /// (one-shot commands and tests)
    pub fn without_signal_handler(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        Self {
            config,
            output_formatter: Arc::new(OutputFormatter::new(output_mode, verbose, quiet)),
            shutdown: GracefulShutdown::manual(),
        }
    }

    /// Create DropWatch instance from CLI arguments
    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        Self::new(
            config,
            cli_args.output_mode(),
            cli_args.verbosity_level(),
            cli_args.quiet,
        )
    }

    /// Audit log that also echoes to this instance's console.
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(&self.config.log_dir).with_console(Arc::clone(&self.output_formatter))
    }

    /// Build the registry, lifecycle and dispatcher. Watch folders are
    /// created here if they do not exist yet.
    pub async fn prepare(&self) -> Result<WatchDispatcher> {
        let logger = self.audit_log();
        logger.initialize().await?;

        let registry = Arc::new(PluginRegistry::from_config(&self.config)?);
        let lifecycle = FileLifecycle::from_config(&self.config.watch, logger.clone());
        let context = PluginContext::new(lifecycle, logger);

        WatchDispatcher::new(&self.config, registry, context)
    }

    /// Validate the configuration and print the routing table without
    /// touching the filesystem.
    pub fn check(&self) -> Result<PluginRegistry> {
        let registry = PluginRegistry::from_config(&self.config)?;

        self.output_formatter
            .print_routing_table(&registry.routes(), &self.config.watch.folders);
        if registry.is_empty() {
            self.output_formatter
                .warning("No plugins are enabled; every file will be skipped");
        }
        self.output_formatter.success("Configuration is valid");

        Ok(registry)
    }

    /// Watch until Ctrl+C, then report what happened.
    pub async fn run(&self) -> Result<SessionReport> {
        self.shutdown.check_shutdown()?;

        let dispatcher = self.prepare().await?;
        self.shutdown.check_shutdown()?;

        let folders = dispatcher.folder_paths();
        self.output_formatter
            .print_routing_table(&dispatcher.registry().routes(), &folders);
        self.output_formatter.info(&format!(
            "Enabled plugins: {}",
            dispatcher.registry().plugin_names().join(", ")
        ));
        self.output_formatter.debug(&format!(
            "Settle after {:?} without growth (polling every {:?}), at most {} concurrent plugin runs",
            self.config.stability_threshold(),
            self.config.poll_interval(),
            self.config.dispatch.max_concurrent
        ));
        if dispatcher.registry().is_empty() {
            self.output_formatter
                .warning("No plugins are enabled; every file will be skipped");
        }
        self.output_formatter.start_watching(&folders);

        let report = dispatcher.run(&self.shutdown).await?;
        self.output_formatter.print_session_summary(&report);

        Ok(report)
    }

    /// Generate sample configuration file
    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        std::fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    /// Get configuration reference
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get output formatter reference
    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn shutdown(&self) -> &GracefulShutdown {
        &self.shutdown
    }

    /// Check if shutdown has been requested
    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    /// Request graceful shutdown
    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    /// Handle error with user-friendly output
    pub fn handle_error(&self, error: &DropWatchError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config_in(temp_dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.log_dir = temp_dir.path().join("logs");
        config.watch.folders = vec![temp_dir.path().join("inbox")];
        config
    }

    #[test]
    fn test_check_builds_registry() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config.plugins.insert(
            "example".to_string(),
            PluginConfig {
                extensions: Some(vec!["txt".to_string()]),
                ..PluginConfig::default()
            },
        );

        let app = DropWatch::without_signal_handler(config, OutputMode::Plain, 0, true);
        let registry = app.check().unwrap();
        assert!(registry.contains("txt"));
        assert!(!temp_dir.path().join("inbox").exists());
    }

    #[test]
    fn test_check_reports_unknown_plugin() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = config_in(&temp_dir);
        config
            .plugins
            .insert("fax".to_string(), PluginConfig::default());

        let app = DropWatch::without_signal_handler(config, OutputMode::Plain, 0, true);
        assert!(matches!(
            app.check(),
            Err(DropWatchError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_prepare_creates_folders_and_logs() {
        let temp_dir = TempDir::new().unwrap();
        let app = DropWatch::without_signal_handler(config_in(&temp_dir), OutputMode::Plain, 0, true);

        let dispatcher = app.prepare().await.unwrap();
        assert!(temp_dir.path().join("logs").is_dir());
        assert!(temp_dir.path().join("inbox").join("completed").is_dir());
        assert!(temp_dir.path().join("inbox").join("failed").is_dir());
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_run_after_shutdown_is_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let app = DropWatch::without_signal_handler(config_in(&temp_dir), OutputMode::Plain, 0, true);

        app.request_shutdown();
        assert!(matches!(app.run().await, Err(DropWatchError::Cancelled)));
    }

    #[test]
    fn test_sample_config_generation() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("sample.toml");

        DropWatch::generate_sample_config(&config_path).unwrap();

        let content = std::fs::read_to_string(&config_path).unwrap();
        assert!(content.contains("[watch]"));
        assert!(content.contains("[plugins.example]"));

        let parsed = Config::load_from_file(&config_path).unwrap();
        parsed.validate().unwrap();
    }

    #[test]
    fn test_shutdown_handling() {
        let app = DropWatch::without_signal_handler(Config::default(), OutputMode::Human, 0, true);

        assert!(app.is_running());
        app.request_shutdown();
        assert!(!app.is_running());
    }
}
