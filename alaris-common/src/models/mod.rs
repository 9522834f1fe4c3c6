// File: alaris-common/src/models/mod.rs
pub mod command;
pub mod plugin;
pub mod user;

pub use command::{Arity, BindingKind, CommandBinding, CommandPermission};
pub use plugin::{PluginInfo, PluginState};
pub use user::{AdminEntry, UserIdentity};
