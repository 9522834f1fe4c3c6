//! src/bot.rs
//!
//! `AlarisBot` owns every piece of the host and wires them together.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use alaris_common::models::UserIdentity;
use alaris_common::traits::IrcConnection;

use crate::Error;
use crate::auth::AdminList;
use crate::commands::{BuiltinCommands, CommandRegistry, Dispatcher, MappingStats, ModuleSource};
use crate::config::BotConfig;
use crate::crypto::Encryptor;
use crate::eventbus::{BotEvent, EventBus};
use crate::plugins::{LibraryLoader, PluginHost, PluginLoader};

pub struct AlarisBot {
    guid: Uuid,
    config: BotConfig,
    event_bus: Arc<EventBus>,
    admins: Arc<AdminList>,
    registry: Arc<CommandRegistry>,
    dispatcher: Arc<Dispatcher>,
    plugins: Arc<PluginHost>,
    builtins: ModuleSource,
}

impl AlarisBot {
    pub fn new(config: BotConfig, connection: Arc<dyn IrcConnection>, event_bus: Arc<EventBus>) -> Result<Self, Error> {
        Self::with_loader(config, connection, event_bus, Arc::new(LibraryLoader))
    }

    pub fn with_loader(
        config: BotConfig,
        connection: Arc<dyn IrcConnection>,
        event_bus: Arc<EventBus>,
        loader: Arc<dyn PluginLoader>,
    ) -> Result<Self, Error> {
        config.validate()?;

        let encryptor = match &config.aes_key {
            Some(key) => Encryptor::from_base64_key(key)?,
            None => {
                warn!("No aes_key configured; using a random key for this session.");
                Encryptor::generate()?
            }
        };

        let admins = Arc::new(AdminList::from_entries(config.admins.clone()));
        let registry = Arc::new(CommandRegistry::new());

        let mut host = PluginHost::new(loader, connection.clone(), config.channels.clone());
        host.set_event_bus(event_bus.clone());
        let plugins = Arc::new(host);

        let builtins = ModuleSource::builtin(Arc::new(BuiltinCommands::new(
            admins.clone(),
            Arc::new(encryptor),
            Arc::downgrade(&registry),
            plugins.clone(),
        )));

        let dispatcher = Dispatcher::new(
            registry.clone(),
            admins.clone(),
            connection,
            config.channels.clone(),
            &config.command_prefix,
        )
        .with_timeout(config.command_timeout());

        Ok(Self {
            guid: Uuid::new_v4(),
            config,
            event_bus,
            admins,
            registry,
            dispatcher: Arc::new(dispatcher),
            plugins,
            builtins,
        })
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        self.event_bus.clone()
    }

    pub fn admins(&self) -> Arc<AdminList> {
        self.admins.clone()
    }

    pub fn registry(&self) -> Arc<CommandRegistry> {
        self.registry.clone()
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    pub fn plugins(&self) -> Arc<PluginHost> {
        self.plugins.clone()
    }

    /// Loads plugins (if enabled) and builds the command table.
    pub async fn start(&self) -> MappingStats {
        info!("Starting Alaris instance {}", self.guid);
        self.load_plugins().await;
        self.create_mappings().await
    }

    /// Rebuilds the command table from the built-ins plus every loaded plugin.
    pub async fn create_mappings(&self) -> MappingStats {
        let mut sources = vec![self.builtins.clone()];
        sources.extend(self.plugins.command_modules());

        let stats = self.registry.create_mappings(sources).await;
        self.event_bus
            .publish(BotEvent::MappingsRebuilt {
                commands: stats.commands,
                sub_commands: stats.sub_commands,
            })
            .await;
        stats
    }

    pub async fn delete_mappings(&self) {
        self.registry.delete_mappings().await;
        self.event_bus
            .publish(BotEvent::MappingsRebuilt { commands: 0, sub_commands: 0 })
            .await;
    }

    /// Loads plugins from the configured directory; does not rebuild.
    pub async fn load_plugins(&self) -> Vec<String> {
        if !self.config.load_plugins {
            info!("Plugin loading is disabled.");
            return Vec::new();
        }
        self.plugins
            .load_plugins_from_directory(&self.config.plugin_directory)
            .await
    }

    /// Unloads one plugin and rebuilds the table. Returns false for unknown names.
    pub async fn unload_plugin(&self, name: &str) -> bool {
        match self.plugins.unload_plugin(name).await {
            Some(_) => {
                self.create_mappings().await;
                true
            }
            None => {
                debug!("No plugin named '{}' to unload", name);
                false
            }
        }
    }

    /// Unloads every plugin, loads the directory again and rebuilds.
    pub async fn reload_plugins(&self) -> Vec<String> {
        self.plugins.unload_all().await;
        self.create_mappings().await;
        let loaded = self.load_plugins().await;
        self.create_mappings().await;
        loaded
    }

    pub async fn handle_command(&self, sender: UserIdentity, channel: &str, raw_message: &str) {
        self.dispatcher.handle_command(sender, channel, raw_message).await;
    }

    /// Dispatches every chat message published on the bus, one task per message.
    pub async fn spawn_dispatch_loop(&self) -> JoinHandle<()> {
        let mut rx = self.event_bus.subscribe(None).await;
        let mut shutdown_rx = self.event_bus.shutdown_rx.clone();
        let dispatcher = self.dispatcher.clone();
        let bus = self.event_bus.clone();

        tokio::spawn(async move {
            while !bus.is_shutdown() {
                tokio::select! {
                    maybe_event = rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        if let BotEvent::ChatMessage { channel, sender, text, .. } = event {
                            let dispatcher = dispatcher.clone();
                            tokio::spawn(async move {
                                dispatcher.handle_command(sender, &channel, &text).await;
                            });
                        }
                    }
                    Ok(_) = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            info!("Dispatch loop ended.");
        })
    }

    /// Stops the dispatch loop, destroys all plugins and clears the table.
    pub async fn shutdown(&self) {
        info!("Shutting down Alaris instance {}", self.guid);
        self.event_bus.shutdown();
        self.plugins.unload_all().await;
        self.registry.delete_mappings().await;
    }
}
