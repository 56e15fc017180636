//! Plugins shipped with the binary, enabled by a `[plugins.<name>]` table.

pub mod example;
pub mod mail;
pub mod ntfy;

pub use example::ExamplePlugin;
pub use mail::MailPlugin;
pub use ntfy::NtfyPlugin;

use crate::config::PluginConfig;
use crate::error::Result;
use crate::plugins::FilePlugin;
use std::sync::Arc;

pub const BUILTIN_PLUGINS: &[&str] = &[ExamplePlugin::NAME, MailPlugin::NAME, NtfyPlugin::NAME];

/// Build the named plugin from its settings, or `None` for an unknown name.
pub fn instantiate(name: &str, config: &PluginConfig) -> Result<Option<Arc<dyn FilePlugin>>> {
    let plugin: Arc<dyn FilePlugin> = match name {
        ExamplePlugin::NAME => Arc::new(ExamplePlugin::from_config(config)),
        MailPlugin::NAME => Arc::new(MailPlugin::from_config(config)?),
        NtfyPlugin::NAME => Arc::new(NtfyPlugin::from_config(config)?),
        _ => return Ok(None),
    };

    Ok(Some(plugin))
}
