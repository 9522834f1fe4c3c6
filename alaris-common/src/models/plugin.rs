use serde::{Deserialize, Serialize};

/// Lifecycle state of a loaded plugin. `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PluginState {
    Loaded,
    Destroyed,
}

/// Snapshot of one tracked plugin, for listings and status output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub name: String,
    pub path: String,
    pub state: PluginState,
}
