use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::ui::OutputMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "dropwatch")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Watch drop folders and hand new files to plugins")]
#[command(
    long_about = "DropWatch watches one or more folders for new files, routes each file to the \
                  plugin registered for its extension, and moves it into a completed or failed \
                  subfolder once the plugin is done."
)]
#[command(before_help = "👀 DropWatch - Drop Folder Dispatcher")]
#[command(after_help = "EXAMPLES:\n  \
    dropwatch --generate-config\n  \
    dropwatch --config dropwatch.toml --check\n  \
    dropwatch --watch ./inbox,./outbox --log-dir ./logs\n  \
    dropwatch --max-concurrent 2 --output-format json")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "DROPWATCH_CONFIG", help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Folders to watch (comma-separated); replaces the configured list
    #[arg(short, long, value_delimiter = ',')]
    pub watch: Option<Vec<PathBuf>>,

    /// Directory for per-plugin log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Name of the subfolder for successfully processed files
    #[arg(long)]
    pub completed_dir: Option<String>,

    /// Name of the subfolder for files that could not be processed
    #[arg(long)]
    pub failed_dir: Option<String>,

    /// Maximum plugin invocations running at once (0 = unbounded)
    #[arg(long)]
    pub max_concurrent: Option<usize>,

    /// Output format for console messages
    #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Validate configuration and print the routing table, then exit
    #[arg(long, help = "Validate configuration and show routing without watching")]
    pub check: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl From<&OutputFormat> for OutputMode {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Human => OutputMode::Human,
            OutputFormat::Json => OutputMode::Json,
            OutputFormat::Plain => OutputMode::Plain,
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_watch(self.watch.clone())
            .with_log_dir(self.log_dir.clone())
            .with_completed_dir(self.completed_dir.clone())
            .with_failed_dir(self.failed_dir.clone())
            .with_max_concurrent(self.max_concurrent)
    }

    pub fn output_mode(&self) -> OutputMode {
        OutputMode::from(&self.output_format)
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_list_is_comma_separated() {
        let cli = Cli::try_parse_from(["dropwatch", "--watch", "./a,./b", "--max-concurrent", "2"])
            .unwrap();

        assert_eq!(
            cli.watch,
            Some(vec![PathBuf::from("./a"), PathBuf::from("./b")])
        );
        assert_eq!(cli.max_concurrent, Some(2));
        assert!(!cli.check);
    }

    #[test]
    fn test_overrides_follow_flags() {
        let cli = Cli::try_parse_from([
            "dropwatch",
            "--completed-dir",
            "done",
            "--failed-dir",
            "broken",
            "--log-dir",
            "/var/log/dropwatch",
        ])
        .unwrap();

        let overrides = cli.create_cli_overrides();
        assert_eq!(overrides.completed_dir.as_deref(), Some("done"));
        assert_eq!(overrides.failed_dir.as_deref(), Some("broken"));
        assert_eq!(overrides.log_dir, Some(PathBuf::from("/var/log/dropwatch")));
        assert!(overrides.watch.is_none());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["dropwatch", "-q", "-v"]).is_err());
    }

    #[test]
    fn test_output_mode_mapping() {
        let cli = Cli::try_parse_from(["dropwatch", "--output-format", "json"]).unwrap();
        assert_eq!(cli.output_mode(), OutputMode::Json);
        assert_eq!(cli.verbosity_level(), 0);
    }

    #[test]
    fn test_load_config_applies_overrides() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("dropwatch.toml");
        std::fs::write(
            &config_path,
            "[watch]\nfolders = [\"./inbox\"]\n\n[plugins.example]\nextensions = [\"txt\"]\n",
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "dropwatch",
            "--config",
            config_path.to_str().unwrap(),
            "--watch",
            "./elsewhere",
        ])
        .unwrap();

        let config = cli.load_config().unwrap();
        assert_eq!(config.watch.folders, vec![PathBuf::from("./elsewhere")]);
        assert!(config.plugins.contains_key("example"));
    }
}
