pub mod builtin;
pub mod contract;
pub mod registry;

pub use contract::{FilePlugin, PluginContext};
pub use registry::{normalize_extension, PluginRegistry, PluginRegistryBuilder};
