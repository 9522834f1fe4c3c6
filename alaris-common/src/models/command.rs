use std::fmt;

use serde::{Deserialize, Serialize};

/// Minimum privilege a sender needs to trigger a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum CommandPermission {
    #[default]
    Normal,
    Admin,
}

/// How many positional tokens a handler takes after the command word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Arity {
    /// Exactly `n` slots. `Fixed(0)` is a context-only handler.
    Fixed(usize),
    /// Any number of tokens, delivered as one sequence.
    Variadic,
}

impl Arity {
    pub fn is_context_only(&self) -> bool {
        matches!(self, Arity::Fixed(0))
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => write!(f, "*"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingKind {
    Command,
    /// Registered like a command; the name is a "parent child" convention
    /// and the parent handler is expected to call it.
    SubCommand,
}

/// Declarative metadata a module attaches to one of its routines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandBinding {
    pub name: String,
    pub permission: CommandPermission,
    pub kind: BindingKind,
    pub fixed_arity: usize,
    pub allow_variadic: bool,
}

impl CommandBinding {
    /// A context-only command with `Normal` permission.
    pub fn command(name: &str) -> Self {
        Self {
            name: name.to_string(),
            permission: CommandPermission::Normal,
            kind: BindingKind::Command,
            fixed_arity: 0,
            allow_variadic: false,
        }
    }

    pub fn sub_command(name: &str) -> Self {
        Self {
            kind: BindingKind::SubCommand,
            ..Self::command(name)
        }
    }

    pub fn admin(mut self) -> Self {
        self.permission = CommandPermission::Admin;
        self
    }

    pub fn with_arity(mut self, fixed_arity: usize) -> Self {
        self.fixed_arity = fixed_arity;
        self
    }

    pub fn variadic(mut self) -> Self {
        self.allow_variadic = true;
        self
    }

    pub fn is_sub_command(&self) -> bool {
        self.kind == BindingKind::SubCommand
    }

    /// The arity this binding asks the registry to record.
    pub fn arity(&self) -> Arity {
        if self.allow_variadic {
            Arity::Variadic
        } else {
            Arity::Fixed(self.fixed_arity)
        }
    }
}
