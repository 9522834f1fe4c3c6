//! src/commands/dispatcher.rs
//!
//! Turns one incoming chat line into (at most) one handler invocation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, span, warn, Instrument, Level};

use alaris_common::models::{Arity, CommandPermission, UserIdentity};
use alaris_common::traits::{CommandContext, IrcConnection, PermissionOracle, Routine};

use crate::commands::registry::{CommandRegistry, HandlerDescriptor};

/// What happened to a message. `handle_command` discards it; tests and the
/// bot's logging look at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No prefix, or nothing after it.
    NotACommand,
    Unknown,
    /// Token count doesn't fit the handler's arity.
    ArityMismatch,
    Forbidden,
    Completed,
    Failed(String),
    Panicked,
    TimedOut,
}

/// Arguments bound for one call, matching the routine's shape.
enum BoundArgs {
    Context,
    Slots(Vec<Option<String>>),
    Sequence(Vec<String>),
}

/// Splits `raw` into the command word and its tokens. The prefix must be
/// followed directly by the command word.
pub fn parse_invocation(prefix: &str, raw: &str) -> Option<(String, Vec<String>)> {
    let body = raw.strip_prefix(prefix)?;
    if body.starts_with(char::is_whitespace) {
        return None;
    }
    let mut words = body.split_whitespace();
    let command = words.next()?.to_string();
    Some((command, words.map(str::to_string).collect()))
}

/// Binds `tokens` against `arity`, padding missing trailing slots with `None`.
/// Returns `None` when the tokens can't be bound.
fn bind(arity: Arity, tokens: Vec<String>) -> Option<BoundArgs> {
    if arity.is_context_only() {
        return tokens.is_empty().then_some(BoundArgs::Context);
    }
    match arity {
        Arity::Fixed(n) => {
            if tokens.len() > n {
                return None;
            }
            let mut slots: Vec<Option<String>> = tokens.into_iter().map(Some).collect();
            slots.resize(n, None);
            Some(BoundArgs::Slots(slots))
        }
        Arity::Variadic => Some(BoundArgs::Sequence(tokens)),
    }
}

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    oracle: Arc<dyn PermissionOracle>,
    connection: Arc<dyn IrcConnection>,
    channels: Vec<String>,
    prefix: String,
    timeout: Option<Duration>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        oracle: Arc<dyn PermissionOracle>,
        connection: Arc<dyn IrcConnection>,
        channels: Vec<String>,
        prefix: &str,
    ) -> Self {
        Self {
            registry,
            oracle,
            connection,
            channels,
            prefix: prefix.to_string(),
            timeout: None,
        }
    }

    /// Bounds every handler invocation; `None` lets handlers run indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Entry point for every incoming chat line. Never fails.
    pub async fn handle_command(&self, sender: UserIdentity, channel: &str, raw_message: &str) {
        let _ = self.dispatch(sender, channel, raw_message).await;
    }

    pub async fn dispatch(&self, sender: UserIdentity, channel: &str, raw_message: &str) -> DispatchOutcome {
        let Some((command, tokens)) = parse_invocation(&self.prefix, raw_message) else {
            return DispatchOutcome::NotACommand;
        };

        let descriptor = match self.registry.lookup(&command) {
            Some(d) if d.is_alive() => d,
            _ => {
                debug!("Unknown command '{}' from {}", command, sender.nick);
                return DispatchOutcome::Unknown;
            }
        };

        let Some(args) = bind(descriptor.arity, tokens) else {
            debug!("Argument count does not fit '{}' ({})", descriptor.command, descriptor.arity);
            return DispatchOutcome::ArityMismatch;
        };

        if descriptor.permission == CommandPermission::Admin && !self.oracle.is_admin(&sender) {
            debug!("{} is not allowed to use '{}'", sender, descriptor.command);
            return DispatchOutcome::Forbidden;
        }

        let ctx = CommandContext {
            channel: channel.to_string(),
            channels: self.channels.clone(),
            connection: self.connection.clone(),
            user: sender.clone(),
        };

        let dispatch_span = span!(
            Level::DEBUG,
            "alaris.command",
            command = %descriptor.command,
            module = %descriptor.module,
            channel = %channel,
            sender = %sender.nick,
        );
        self.invoke(descriptor, ctx, args).instrument(dispatch_span).await
    }

    async fn invoke(&self, descriptor: Arc<HandlerDescriptor>, ctx: CommandContext, args: BoundArgs) -> DispatchOutcome {
        // Teardown of the owning module waits for this pass to be dropped.
        let Some(pass) = descriptor.liveness().enter().await else {
            debug!("Module '{}' was unloaded before '{}' could run", descriptor.module, descriptor.command);
            return DispatchOutcome::Unknown;
        };

        let routine = descriptor.routine().clone();
        let task = tokio::spawn(async move {
            let _pass = pass;
            match (routine, args) {
                (Routine::Bare(call), BoundArgs::Context) => call(ctx).await,
                (Routine::Positional { call, .. }, BoundArgs::Context) => call(ctx, Vec::new()).await,
                (Routine::Positional { call, .. }, BoundArgs::Slots(slots)) => call(ctx, slots).await,
                (Routine::Variadic(call), BoundArgs::Sequence(tokens)) => call(ctx, tokens).await,
                _ => Err(alaris_common::Error::Command("routine does not match its recorded arity".into())),
            }
        });
        let abort = task.abort_handle();

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    abort.abort();
                    warn!("Command '{}' timed out after {:?}; aborted", descriptor.command, limit);
                    return DispatchOutcome::TimedOut;
                }
            },
            None => task.await,
        };

        match joined {
            Ok(Ok(())) => DispatchOutcome::Completed,
            Ok(Err(e)) => {
                error!("Command '{}' from module '{}' failed: {}", descriptor.command, descriptor.module, e);
                DispatchOutcome::Failed(e.to_string())
            }
            Err(e) if e.is_panic() => {
                error!("Command '{}' from module '{}' panicked", descriptor.command, descriptor.module);
                DispatchOutcome::Panicked
            }
            Err(e) => {
                warn!("Command '{}' was cancelled: {}", descriptor.command, e);
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}
