pub mod client;
pub mod runtime;

pub use client::{IrcClient, IrcHandle, IrcIncomingEvent, IrcMessage};
pub use runtime::IrcRuntime;
