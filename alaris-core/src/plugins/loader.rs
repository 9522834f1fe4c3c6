// src/plugins/loader.rs
//
// Turns a file on disk into a plugin instance.

use std::path::Path;

use libloading::Library;
use tracing::debug;

use alaris_common::plugin::{
    PLUGIN_ABI_SYMBOL, PLUGIN_ABI_VERSION, PLUGIN_CREATE_SYMBOL, PluginAbiVersionFn, PluginBox,
    PluginCreateFn,
};

use crate::Error;

#[cfg_attr(test, mockall::automock)]
pub trait PluginLoader: Send + Sync {
    /// Opens `path` and constructs the plugin it exports. Must not call `setup`.
    fn load(&self, path: &Path) -> Result<PluginBox, Error>;
}

/// Loads `declare_plugin!` cdylibs with `libloading`.
///
/// A library that yields a plugin is never closed again; its code stays
/// mapped for the rest of the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibraryLoader;

impl PluginLoader for LibraryLoader {
    fn load(&self, path: &Path) -> Result<PluginBox, Error> {
        unsafe {
            let lib = Library::new(path)?;

            let abi_version: PluginAbiVersionFn = *lib.get::<PluginAbiVersionFn>(PLUGIN_ABI_SYMBOL)?;
            let found = abi_version();
            if found != PLUGIN_ABI_VERSION {
                return Err(Error::Plugin(format!(
                    "{} was built for plugin ABI {found}, host expects {PLUGIN_ABI_VERSION}",
                    path.display()
                )));
            }

            let constructor: PluginCreateFn = *lib.get::<PluginCreateFn>(PLUGIN_CREATE_SYMBOL)?;
            let raw = constructor();
            if raw.is_null() {
                return Err(Error::Plugin(format!("{} returned no plugin", path.display())));
            }
            let plugin: PluginBox = *Box::from_raw(raw);
            std::mem::forget(lib);

            debug!("Opened plugin library {}", path.display());
            Ok(plugin)
        }
    }
}
