// src/plugins/types.rs
use std::path::PathBuf;
use std::sync::Arc;

use alaris_common::models::{PluginInfo, PluginState};
use alaris_common::plugin::PluginBox;
use alaris_common::traits::{CommandModule, Registrar};

use crate::commands::registry::{Liveness, ModuleSource};

/// A set-up plugin, shared with the registry as a scan target.
pub struct PluginModule {
    plugin: PluginBox,
}

impl PluginModule {
    pub fn new(plugin: PluginBox) -> Self {
        Self { plugin }
    }

    pub(crate) fn destroy(&self) {
        self.plugin.destroy();
    }
}

impl CommandModule for PluginModule {
    fn name(&self) -> &str {
        self.plugin.name()
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        self.plugin.register_commands(registrar);
    }
}

/// One tracked plugin. Owned and mutated only by the `PluginHost`.
pub struct PluginDescriptor {
    pub name: String,
    pub path: PathBuf,
    pub state: PluginState,
    pub(crate) module: Arc<PluginModule>,
    pub(crate) alive: Liveness,
}

impl PluginDescriptor {
    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }

    pub fn info(&self) -> PluginInfo {
        PluginInfo {
            name: self.name.clone(),
            path: self.path.display().to_string(),
            state: self.state,
        }
    }

    pub fn module_source(&self) -> ModuleSource {
        ModuleSource::new(self.module.clone(), self.alive.clone())
    }
}
