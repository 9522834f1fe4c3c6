// File: alaris-common/src/traits/api.rs
//
// Seams between the dispatch core and the collaborators it talks to.

use crate::models::UserIdentity;

/// The live IRC connection as seen by command implementations.
///
/// Calls are fire-and-forget: lines are queued for the writer task and
/// delivery failures are logged by the connection itself.
pub trait IrcConnection: Send + Sync {
    /// Sends a PRIVMSG to a channel or nick.
    fn send_message(&self, channel: &str, text: &str);

    fn join_channel(&self, channel: &str);

    fn part_channel(&self, channel: &str);

    /// The nickname the bot registered with.
    fn nickname(&self) -> String;
}

/// Answers "is this sender an administrator".
pub trait PermissionOracle: Send + Sync {
    fn is_admin(&self, identity: &UserIdentity) -> bool;
}
