use crate::config::Config;
use crate::error::{DropWatchError, Result};
use crate::plugins::builtin;
use crate::plugins::FilePlugin;
use std::collections::HashMap;
use std::sync::Arc;

/// Lower-cased file extension -> the single plugin that handles it.
///
/// Built once at startup and read-only afterwards, so it can be shared
/// across dispatch tasks behind an `Arc`.
pub struct PluginRegistry {
    handlers: HashMap<String, Arc<dyn FilePlugin>>,
}

#[derive(Default)]
pub struct PluginRegistryBuilder {
    handlers: HashMap<String, Arc<dyn FilePlugin>>,
}

/// Strip a leading dot and lower-case; `None` if nothing is left.
pub fn normalize_extension(extension: &str) -> Option<String> {
    let normalized = extension.trim().trim_start_matches('.').to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

impl PluginRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `extension` to `plugin`. Claiming an extension twice is an error.
    pub fn register(&mut self, extension: &str, plugin: Arc<dyn FilePlugin>) -> Result<()> {
        let extension = normalize_extension(extension).ok_or_else(|| {
            DropWatchError::invalid_argument(format!(
                "Plugin '{}' was registered with an empty extension",
                plugin.name()
            ))
        })?;

        if let Some(existing) = self.handlers.get(&extension) {
            return Err(DropWatchError::DuplicateExtension {
                extension,
                existing: existing.name().to_string(),
                plugin: plugin.name().to_string(),
            });
        }

        self.handlers.insert(extension, plugin);
        Ok(())
    }

    pub fn build(self) -> PluginRegistry {
        PluginRegistry {
            handlers: self.handlers,
        }
    }
}

impl PluginRegistry {
    pub fn builder() -> PluginRegistryBuilder {
        PluginRegistryBuilder::new()
    }

    pub fn empty() -> Self {
        PluginRegistryBuilder::new().build()
    }

    /// Instantiate every enabled built-in plugin listed under `[plugins.*]`.
    ///
    /// Enabling is opt-in: a built-in with no `[plugins.<name>]` table is
    /// not loaded at all, and a table with `disabled = true` turns it off.
    /// Plugins are never picked up just because they ship with the binary.
    ///
    /// Tables are visited in name order, so the outcome does not depend on
    /// filesystem or hash ordering.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Self::builder();

        for (name, plugin_config) in &config.plugins {
            if plugin_config.disabled {
                continue;
            }

            let plugin = builtin::instantiate(name, plugin_config)?.ok_or_else(|| {
                DropWatchError::configuration(format!(
                    "Unknown plugin '{}' (available: {})",
                    name,
                    builtin::BUILTIN_PLUGINS.join(", ")
                ))
            })?;

            for extension in plugin_config.extensions_for(name) {
                builder.register(&extension, Arc::clone(&plugin))?;
            }
        }

        Ok(builder.build())
    }

    pub fn get(&self, extension: &str) -> Option<Arc<dyn FilePlugin>> {
        normalize_extension(extension).and_then(|ext| self.handlers.get(&ext).cloned())
    }

    pub fn contains(&self, extension: &str) -> bool {
        self.get(extension).is_some()
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.handlers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    /// `(extension, plugin name)` pairs sorted by extension.
    pub fn routes(&self) -> Vec<(String, String)> {
        self.extensions()
            .into_iter()
            .filter_map(|ext| {
                let plugin = self.handlers.get(&ext)?.name().to_string();
                Some((ext, plugin))
            })
            .collect()
    }

    /// Distinct plugin names, sorted.
    pub fn plugin_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .values()
            .map(|plugin| plugin.name().to_string())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
