//! alaris-common/src/plugin.rs
//!
//! The contract a dynamically loaded plugin library has to fulfil, plus the
//! `declare_plugin!` macro that exports the symbols the host looks up.

use std::sync::Arc;

use crate::error::Error;
use crate::traits::api::IrcConnection;
use crate::traits::command_traits::CommandModule;

/// Bumped whenever the layout of anything crossing the library boundary changes.
pub const PLUGIN_ABI_VERSION: u32 = 1;

pub const PLUGIN_ABI_SYMBOL: &[u8] = b"_alaris_plugin_abi_version";
pub const PLUGIN_CREATE_SYMBOL: &[u8] = b"_alaris_plugin_create";

/// Double-boxed so the constructor can hand a thin pointer over `extern "C"`.
pub type PluginBox = Box<dyn AlarisPlugin>;

pub type PluginAbiVersionFn = unsafe extern "C" fn() -> u32;
pub type PluginCreateFn = unsafe extern "C" fn() -> *mut PluginBox;

/// The single extensibility entry point of a plugin library.
///
/// `setup` runs exactly once, before the plugin's commands are eligible for
/// registration. `destroy` runs exactly once at unload; the host never calls
/// into the plugin afterwards.
pub trait AlarisPlugin: CommandModule {
    fn setup(&mut self, connection: Arc<dyn IrcConnection>, channels: &[String]) -> Result<(), Error>;

    fn destroy(&self);
}

/// Exports the ABI version and constructor symbols for a plugin type.
///
/// ```ignore
/// alaris_common::declare_plugin!(HelloPlugin, HelloPlugin::new);
/// ```
#[macro_export]
macro_rules! declare_plugin {
    ($plugin_type:ty, $constructor:path) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _alaris_plugin_abi_version() -> u32 {
            $crate::plugin::PLUGIN_ABI_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _alaris_plugin_create() -> *mut $crate::plugin::PluginBox {
            let plugin: $plugin_type = $constructor();
            let boxed: $crate::plugin::PluginBox = Box::new(plugin);
            Box::into_raw(Box::new(boxed))
        }
    };
}
