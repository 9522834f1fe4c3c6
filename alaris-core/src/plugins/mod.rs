// src/plugins/mod.rs

pub mod host;
pub mod loader;
pub mod types;

pub use host::PluginHost;
pub use loader::{LibraryLoader, PluginLoader};
pub use types::{PluginDescriptor, PluginModule};
