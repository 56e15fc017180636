use crate::error::{DropWatchError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub log_dir: PathBuf,
    pub watch: WatchConfig,
    pub dispatch: DispatchConfig,
    pub plugins: BTreeMap<String, PluginConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub folders: Vec<PathBuf>,
    pub completed_dir: String,
    pub failed_dir: String,
    pub stability_threshold_ms: u64,
    pub poll_interval_ms: u64,
    pub ignore_patterns: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on plugin invocations running at once; 0 disables the limit.
    pub max_concurrent: usize,
}

/// Settings for one plugin, keyed by the plugin's name in `[plugins.<name>]`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<Vec<String>>,
    #[serde(flatten)]
    pub settings: toml::Table,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("./logs"),
            watch: WatchConfig::default(),
            dispatch: DispatchConfig::default(),
            plugins: BTreeMap::new(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            folders: Vec::new(),
            completed_dir: "completed".to_string(),
            failed_dir: "failed".to_string(),
            stability_threshold_ms: 2000,
            poll_interval_ms: 100,
            ignore_patterns: vec![
                r"^\.".to_string(),
                r"~$".to_string(),
                r"\.(swp|tmp|part)$".to_string(),
            ],
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: num_cpus::get().max(1) * 4,
        }
    }
}

impl PluginConfig {
    /// Extensions this plugin is registered under; defaults to the plugin name.
    pub fn extensions_for(&self, plugin_name: &str) -> Vec<String> {
        match self.extensions {
            Some(ref extensions) if !extensions.is_empty() => extensions.clone(),
            _ => vec![plugin_name.to_string()],
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.settings
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.settings.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.settings.get(key).and_then(|v| v.as_integer())
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(DropWatchError::Configuration {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| DropWatchError::Configuration {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| DropWatchError::Configuration {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })?;

        Ok(config)
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                let default_paths = ["dropwatch.toml", "dropwatch.config.toml", ".dropwatch.toml"];

                for default_path in &default_paths {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }

                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(ref folders) = cli_args.watch {
            self.watch.folders = folders.clone();
        }

        if let Some(ref log_dir) = cli_args.log_dir {
            self.log_dir = log_dir.clone();
        }

        if let Some(ref completed_dir) = cli_args.completed_dir {
            self.watch.completed_dir = completed_dir.trim().to_string();
        }

        if let Some(ref failed_dir) = cli_args.failed_dir {
            self.watch.failed_dir = failed_dir.trim().to_string();
        }

        if let Some(max_concurrent) = cli_args.max_concurrent {
            self.dispatch.max_concurrent = max_concurrent;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.watch.folders.is_empty() {
            return Err(DropWatchError::Configuration {
                message: "\"watch.folders\" needs at least one folder to watch".to_string(),
            });
        }

        if self.log_dir.as_os_str().is_empty() {
            return Err(DropWatchError::Configuration {
                message: "\"log_dir\" cannot be empty".to_string(),
            });
        }

        validate_subdirectory_name("watch.completed_dir", &self.watch.completed_dir)?;
        validate_subdirectory_name("watch.failed_dir", &self.watch.failed_dir)?;

        if self.watch.completed_dir == self.watch.failed_dir {
            return Err(DropWatchError::Configuration {
                message: format!(
                    "Completed and failed folders must differ (both are \"{}\")",
                    self.watch.completed_dir
                ),
            });
        }

        if self.watch.poll_interval_ms == 0 {
            return Err(DropWatchError::Configuration {
                message: "\"watch.poll_interval_ms\" must be greater than 0".to_string(),
            });
        }

        for pattern in &self.watch.ignore_patterns {
            regex::Regex::new(pattern)?;
        }

        Ok(())
    }

    pub fn stability_threshold(&self) -> Duration {
        Duration::from_millis(self.watch.stability_threshold_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.watch.poll_interval_ms)
    }

    pub fn create_sample_config() -> String {
        let mut sample_config = Self::default();
        sample_config.watch.folders = vec![PathBuf::from("./inbox")];

        let mut example = PluginConfig {
            extensions: Some(vec!["txt".to_string()]),
            ..PluginConfig::default()
        };
        example.settings.insert(
            "completion_note".to_string(),
            toml::Value::String(String::new()),
        );
        sample_config.plugins.insert("example".to_string(), example);

        let mut ntfy = PluginConfig {
            disabled: true,
            ..PluginConfig::default()
        };
        for (key, value) in [
            ("host", "https://ntfy.sh"),
            ("access_token", "tk_replace_me"),
            ("default_topic", "alerts"),
        ] {
            ntfy.settings
                .insert(key.to_string(), toml::Value::String(value.to_string()));
        }
        ntfy.settings
            .insert("default_priority".to_string(), toml::Value::Integer(3));
        ntfy.settings
            .insert("markdown".to_string(), toml::Value::Boolean(false));
        sample_config.plugins.insert("ntfy".to_string(), ntfy);

        let mut mail = PluginConfig {
            disabled: true,
            ..PluginConfig::default()
        };
        for (key, value) in [
            ("host", "smtp.example.com"),
            ("user", "dropwatch@example.com"),
            ("password", "replace_me"),
            ("from", "Dropwatch <dropwatch@example.com>"),
        ] {
            mail.settings
                .insert(key.to_string(), toml::Value::String(value.to_string()));
        }
        mail.settings
            .insert("port".to_string(), toml::Value::Integer(465));
        for key in ["secure", "html", "allow_from_override"] {
            mail.settings
                .insert(key.to_string(), toml::Value::Boolean(key == "secure"));
        }
        sample_config.plugins.insert("mail".to_string(), mail);

        toml::to_string_pretty(&sample_config).unwrap_or_else(|_| String::new())
    }
}

fn validate_subdirectory_name(field: &str, name: &str) -> Result<()> {
    let mut components = Path::new(name).components();
    let single_normal = matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    );

    if name.trim().is_empty() || !single_normal {
        return Err(DropWatchError::Configuration {
            message: format!(
                "\"{}\" must be a plain folder name, got \"{}\"",
                field, name
            ),
        });
    }

    Ok(())
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub watch: Option<Vec<PathBuf>>,
    pub log_dir: Option<PathBuf>,
    pub completed_dir: Option<String>,
    pub failed_dir: Option<String>,
    pub max_concurrent: Option<usize>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_watch(mut self, watch: Option<Vec<PathBuf>>) -> Self {
        self.watch = watch;
        self
    }

    pub fn with_log_dir(mut self, log_dir: Option<PathBuf>) -> Self {
        self.log_dir = log_dir;
        self
    }

    pub fn with_completed_dir(mut self, completed_dir: Option<String>) -> Self {
        self.completed_dir = completed_dir;
        self
    }

    pub fn with_failed_dir(mut self, failed_dir: Option<String>) -> Self {
        self.failed_dir = failed_dir;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }
}
