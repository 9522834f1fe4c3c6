// src/commands/mod.rs

pub mod builtin;
pub mod dispatcher;
pub mod registry;

pub use builtin::BuiltinCommands;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use registry::{CommandRegistry, HandlerDescriptor, Liveness, MappingStats, ModuleSource};
