// File: alaris-core/src/commands/builtin/mod.rs
//! Commands that ship with the host: `admin`, `aes` (+ `aes encrypt`),
//! `listcmds` and `plugins`. Each lives in its own file; `BuiltinCommands`
//! registers them all as one module.

pub mod admin;
pub mod aes;
pub mod listing;

use std::sync::{Arc, Weak};

use alaris_common::models::CommandBinding;
use alaris_common::traits::{CommandModule, Registrar, Routine};

use crate::auth::AdminList;
use crate::commands::registry::CommandRegistry;
use crate::crypto::Encryptor;
use crate::plugins::PluginHost;

pub const BUILTIN_MODULE_NAME: &str = "alaris";

pub struct BuiltinCommands {
    admins: Arc<AdminList>,
    encryptor: Arc<Encryptor>,
    /// Weak: the registry's descriptors hold this module's routines.
    registry: Weak<CommandRegistry>,
    plugins: Arc<PluginHost>,
}

impl BuiltinCommands {
    pub fn new(
        admins: Arc<AdminList>,
        encryptor: Arc<Encryptor>,
        registry: Weak<CommandRegistry>,
        plugins: Arc<PluginHost>,
    ) -> Self {
        Self { admins, encryptor, registry, plugins }
    }
}

impl CommandModule for BuiltinCommands {
    fn name(&self) -> &str {
        BUILTIN_MODULE_NAME
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        let admins = self.admins.clone();
        registrar.register(
            CommandBinding::command("admin").admin().with_arity(4),
            Routine::positional(move |ctx, args: [Option<String>; 4]| admin::handle_admin(admins.clone(), ctx, args)),
        );

        let encryptor = self.encryptor.clone();
        registrar.register(
            CommandBinding::command("aes").variadic(),
            Routine::variadic(move |ctx, tokens| aes::handle_aes(encryptor.clone(), ctx, tokens)),
        );

        let encryptor = self.encryptor.clone();
        registrar.register(
            CommandBinding::sub_command("aes encrypt").with_arity(1),
            Routine::positional(move |ctx, args: [Option<String>; 1]| {
                aes::handle_aes_encrypt(encryptor.clone(), ctx, args)
            }),
        );

        let registry = self.registry.clone();
        registrar.register(
            CommandBinding::command("listcmds"),
            Routine::bare(move |ctx| listing::handle_listcmds(registry.clone(), ctx)),
        );

        let plugins = self.plugins.clone();
        registrar.register(
            CommandBinding::command("plugins").admin(),
            Routine::bare(move |ctx| listing::handle_plugins(plugins.clone(), ctx)),
        );
    }
}
