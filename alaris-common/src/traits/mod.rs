pub mod api;
pub mod command_traits;

pub use api::{IrcConnection, PermissionOracle};
pub use command_traits::{
    CommandContext, CommandModule, HandlerFuture, HandlerResult, Registrar, Registration, Routine,
};
