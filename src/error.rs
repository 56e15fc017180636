use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DropWatchError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Extension '{extension}' is already handled by plugin '{existing}' (while registering '{plugin}')")]
    DuplicateExtension {
        extension: String,
        existing: String,
        plugin: String,
    },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Lifecycle transition failed for {path}: {source}")]
    Lifecycle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Plugin '{plugin}' failed: {message}")]
    Plugin { plugin: String, message: String },

    #[error("Unable to watch folders: {message}")]
    Watch {
        message: String,
        #[source]
        source: notify::Error,
    },

    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Operation was cancelled by user")]
    Cancelled,
}

impl DropWatchError {
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        DropWatchError::Configuration {
            message: message.into(),
        }
    }

    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        DropWatchError::InvalidArgument {
            message: message.into(),
        }
    }

    pub fn plugin<P: Into<String>, S: Into<String>>(plugin: P, message: S) -> Self {
        DropWatchError::Plugin {
            plugin: plugin.into(),
            message: message.into(),
        }
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for DropWatchError {
    fn user_message(&self) -> String {
        match self {
            DropWatchError::Configuration { message } => {
                format!("Configuration error: {}", message)
            }
            DropWatchError::DuplicateExtension {
                extension,
                existing,
                plugin,
            } => {
                format!(
                    "Both '{}' and '{}' want to handle .{} files",
                    existing, plugin, extension
                )
            }
            DropWatchError::InvalidArgument { message } => {
                format!("Invalid argument: {}", message)
            }
            DropWatchError::Lifecycle { path, source } => {
                format!("Could not finish processing {}: {}", path.display(), source)
            }
            DropWatchError::Plugin { plugin, message } => {
                format!("Plugin {} reported: {}", plugin, message)
            }
            DropWatchError::Watch { message, .. } => {
                format!("Unable to watch folders: {}", message)
            }
            DropWatchError::Cancelled => "Operation was cancelled by user".to_string(),
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            DropWatchError::Configuration { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present. Run with --generate-config for a sample.".to_string()
            ),
            DropWatchError::DuplicateExtension { extension, .. } => Some(format!(
                "Remove '{}' from the extensions list of one of the plugins, or disable one of them.",
                extension
            )),
            DropWatchError::Lifecycle { .. } => Some(
                "The file may have been modified but not moved. Inspect it and move it to the completed or failed folder by hand.".to_string()
            ),
            DropWatchError::Watch { .. } => Some(
                "Ensure the watched folders exist and that the system's file watch limit has not been reached.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for DropWatchError {
    fn from(error: toml::de::Error) -> Self {
        DropWatchError::Configuration {
            message: error.to_string(),
        }
    }
}

impl From<regex::Error> for DropWatchError {
    fn from(error: regex::Error) -> Self {
        DropWatchError::Configuration {
            message: format!("Invalid ignore pattern: {}", error),
        }
    }
}

pub type Result<T> = std::result::Result<T, DropWatchError>;
