// File: alaris-common/src/traits/command_traits.rs
//
// Explicit registration table: every module hands `(binding, routine)` pairs
// to a `Registrar`, and the registry scans those instead of reflecting over
// functions.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::{self, BoxFuture};

use crate::error::Error;
use crate::models::{CommandBinding, UserIdentity};
use crate::traits::api::IrcConnection;

pub type HandlerResult = Result<(), Error>;
pub type HandlerFuture = BoxFuture<'static, HandlerResult>;

type BareFn = dyn Fn(CommandContext) -> HandlerFuture + Send + Sync;
type PositionalFn = dyn Fn(CommandContext, Vec<Option<String>>) -> HandlerFuture + Send + Sync;
type VariadicFn = dyn Fn(CommandContext, Vec<String>) -> HandlerFuture + Send + Sync;

/// Per-invocation context passed as the first argument to every handler.
/// Built fresh for each dispatched message.
#[derive(Clone)]
pub struct CommandContext {
    /// Channel (or nick, for private messages) the command came from.
    pub channel: String,
    /// Every channel the bot is currently configured for.
    pub channels: Vec<String>,
    pub connection: Arc<dyn IrcConnection>,
    pub user: UserIdentity,
}

impl CommandContext {
    /// Replies to the originating channel.
    pub fn reply(&self, text: &str) {
        self.connection.send_message(&self.channel, text);
    }
}

/// A handler routine together with the parameter list it was written against.
#[derive(Clone)]
pub enum Routine {
    /// Takes only the context.
    Bare(Arc<BareFn>),
    /// Takes the context plus exactly `slots` positional tokens.
    Positional { slots: usize, call: Arc<PositionalFn> },
    /// Takes the context plus every token as one sequence.
    Variadic(Arc<VariadicFn>),
}

impl Routine {
    pub fn bare<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Routine::Bare(Arc::new(move |ctx| -> HandlerFuture { Box::pin(f(ctx)) }))
    }

    /// The slot count is taken from the array length in the closure's
    /// signature, so `|ctx, [a, b]: [Option<String>; 2]|` declares two.
    pub fn positional<const N: usize, F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext, [Option<String>; N]) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let call = move |ctx, args: Vec<Option<String>>| -> HandlerFuture {
            match <[Option<String>; N]>::try_from(args) {
                Ok(slots) => Box::pin(f(ctx, slots)),
                Err(args) => Box::pin(future::ready(Err(Error::Arity {
                    expected: N,
                    got: args.len(),
                }))),
            }
        };
        Routine::Positional { slots: N, call: Arc::new(call) }
    }

    pub fn variadic<F, Fut>(f: F) -> Self
    where
        F: Fn(CommandContext, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Routine::Variadic(Arc::new(move |ctx, tokens| -> HandlerFuture { Box::pin(f(ctx, tokens)) }))
    }

    /// Declared parameter count excluding the context; `None` for variadic.
    pub fn parameter_count(&self) -> Option<usize> {
        match self {
            Routine::Bare(_) => Some(0),
            Routine::Positional { slots, .. } => Some(*slots),
            Routine::Variadic(_) => None,
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(self, Routine::Variadic(_))
    }
}

/// One `(binding, routine)` pair as handed over by a module.
#[derive(Clone)]
pub struct Registration {
    pub binding: CommandBinding,
    pub routine: Routine,
}

/// Collects a module's registrations during a registry rebuild.
pub struct Registrar {
    module: String,
    registrations: Vec<Registration>,
}

impl Registrar {
    pub fn new(module: &str) -> Self {
        Self {
            module: module.to_string(),
            registrations: Vec::new(),
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn register(&mut self, binding: CommandBinding, routine: Routine) -> &mut Self {
        self.registrations.push(Registration { binding, routine });
        self
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn into_registrations(self) -> Vec<Registration> {
        self.registrations
    }
}

/// Anything that contributes routines to the command registry: the host's
/// built-in commands and every loaded plugin.
pub trait CommandModule: Send + Sync {
    fn name(&self) -> &str;

    fn register_commands(&self, registrar: &mut Registrar);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_slot_count_comes_from_signature() {
        let r = Routine::positional(|_ctx, [_a, _b, _c]: [Option<String>; 3]| async { Ok(()) });
        assert_eq!(r.parameter_count(), Some(3));
        assert!(!r.is_variadic());

        let bare = Routine::bare(|_ctx| async { Ok(()) });
        assert_eq!(bare.parameter_count(), Some(0));

        let var = Routine::variadic(|_ctx, _tokens| async { Ok(()) });
        assert_eq!(var.parameter_count(), None);
        assert!(var.is_variadic());
    }

    #[test]
    fn registrar_keeps_registration_order() {
        let mut reg = Registrar::new("test");
        reg.register(CommandBinding::command("one"), Routine::bare(|_| async { Ok(()) }))
            .register(CommandBinding::command("two"), Routine::bare(|_| async { Ok(()) }));
        assert_eq!(reg.module(), "test");
        assert_eq!(reg.len(), 2);
        let names: Vec<_> = reg
            .into_registrations()
            .into_iter()
            .map(|r| r.binding.name)
            .collect();
        assert_eq!(names, vec!["one", "two"]);
    }
}
