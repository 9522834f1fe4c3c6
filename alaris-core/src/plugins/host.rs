//! src/plugins/host.rs
//!
//! Discovers, sets up, tracks and tears down plugins.

use std::collections::HashSet;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use alaris_common::models::{PluginInfo, PluginState};
use alaris_common::plugin::PluginBox;
use alaris_common::traits::IrcConnection;

use crate::Error;
use crate::commands::registry::{Liveness, ModuleSource};
use crate::eventbus::{BotEvent, EventBus};
use crate::plugins::loader::PluginLoader;
use crate::plugins::types::{PluginDescriptor, PluginModule};

pub struct PluginHost {
    loader: Arc<dyn PluginLoader>,
    connection: Arc<dyn IrcConnection>,
    channels: Vec<String>,
    /// In load order.
    plugins: RwLock<Vec<PluginDescriptor>>,
    /// Serializes load and unload.
    writer: Mutex<()>,
    event_bus: Option<Arc<EventBus>>,
}

impl PluginHost {
    pub fn new(loader: Arc<dyn PluginLoader>, connection: Arc<dyn IrcConnection>, channels: Vec<String>) -> Self {
        Self {
            loader,
            connection,
            channels,
            plugins: RwLock::new(Vec::new()),
            writer: Mutex::new(()),
            event_bus: None,
        }
    }

    pub fn set_event_bus(&mut self, bus: Arc<EventBus>) {
        self.event_bus = Some(bus);
    }

    /// Loads every shared library in `dir`. Each file that fails is logged
    /// and skipped; returns the names of the plugins that were added.
    pub async fn load_plugins_from_directory(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let _guard = self.writer.lock().await;
        let dir = dir.as_ref();
        let paths = match library_files(dir) {
            Ok(paths) => paths,
            Err(e) => {
                info!("Plugin directory '{}' is not readable ({}); skipping.", dir.display(), e);
                return Vec::new();
            }
        };
        if paths.is_empty() {
            info!("No plugins found in '{}'", dir.display());
            return Vec::new();
        }

        let opened = join_all(paths.iter().cloned().map(|path| {
            let loader = self.loader.clone();
            tokio::task::spawn_blocking(move || {
                panic::catch_unwind(AssertUnwindSafe(|| loader.load(&path)))
                    .unwrap_or_else(|_| Err(Error::Plugin("plugin constructor panicked".into())))
            })
        }))
        .await;

        let mut taken: HashSet<String> = self.plugins.read().iter().map(|p| p.name.clone()).collect();
        let mut accepted: Vec<(PathBuf, PluginBox)> = Vec::new();
        for (path, result) in paths.into_iter().zip(opened) {
            let plugin = match result {
                Ok(Ok(plugin)) => plugin,
                Ok(Err(e)) => {
                    error!("Failed to load plugin {}: {}", path.display(), e);
                    continue;
                }
                Err(e) => {
                    error!("Loading {} did not finish: {}", path.display(), e);
                    continue;
                }
            };
            let name = plugin.name().to_string();
            if name.trim().is_empty() {
                error!("Plugin at {} has an empty name; skipping", path.display());
                continue;
            }
            if !taken.insert(name.clone()) {
                warn!("A plugin named '{}' is already loaded; skipping {}", name, path.display());
                continue;
            }
            accepted.push((path, plugin));
        }

        let set_up = join_all(accepted.into_iter().map(|(path, mut plugin)| {
            let connection = self.connection.clone();
            let channels = self.channels.clone();
            tokio::task::spawn_blocking(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| plugin.setup(connection, &channels)))
                    .unwrap_or_else(|_| Err(Error::Plugin("setup panicked".into())));
                (path, plugin, outcome)
            })
        }))
        .await;

        let mut added = Vec::new();
        for joined in set_up {
            let (path, plugin, outcome) = match joined {
                Ok(v) => v,
                Err(e) => {
                    error!("Plugin setup task failed: {}", e);
                    continue;
                }
            };
            let name = plugin.name().to_string();
            if let Err(e) = outcome {
                error!("Setup of plugin '{}' ({}) failed: {}", name, path.display(), e);
                continue;
            }

            let descriptor = PluginDescriptor {
                name: name.clone(),
                path: path.clone(),
                state: PluginState::Loaded,
                module: Arc::new(PluginModule::new(plugin)),
                alive: Liveness::new(),
            };
            let rejected = {
                let mut plugins = self.plugins.write();
                if plugins.iter().any(|p| p.name == name) {
                    Some(descriptor)
                } else {
                    plugins.push(descriptor);
                    None
                }
            };
            if let Some(mut stray) = rejected {
                warn!("A plugin named '{}' is already loaded; discarding {}", name, path.display());
                teardown(&mut stray).await;
                continue;
            }

            info!("Loaded plugin '{}' from {}", name, path.display());
            self.publish(BotEvent::PluginLoaded {
                name: name.clone(),
                path: path.display().to_string(),
            })
            .await;
            added.push(name);
        }
        added
    }

    /// Destroys and forgets the plugin called `name`. Unknown names are a no-op.
    /// Returns once every running command of the plugin has finished.
    pub async fn unload_plugin(&self, name: &str) -> Option<PluginInfo> {
        let _guard = self.writer.lock().await;
        let mut removed = {
            let mut plugins = self.plugins.write();
            let index = plugins.iter().position(|p| p.name == name)?;
            plugins.remove(index)
        };
        teardown(&mut removed).await;

        info!("Unloaded plugin '{}'", removed.name);
        self.publish(BotEvent::PluginUnloaded { name: removed.name.clone() }).await;
        Some(removed.info())
    }

    /// Destroys every plugin, newest first.
    pub async fn unload_all(&self) -> Vec<PluginInfo> {
        let _guard = self.writer.lock().await;
        let drained: Vec<PluginDescriptor> = self.plugins.write().drain(..).rev().collect();

        let mut infos = Vec::with_capacity(drained.len());
        for mut descriptor in drained {
            teardown(&mut descriptor).await;
            info!("Unloaded plugin '{}'", descriptor.name);
            self.publish(BotEvent::PluginUnloaded { name: descriptor.name.clone() }).await;
            infos.push(descriptor.info());
        }
        infos
    }

    /// Scan targets for the next registry rebuild, in load order.
    pub fn command_modules(&self) -> Vec<ModuleSource> {
        self.plugins
            .read()
            .iter()
            .filter(|p| p.is_alive())
            .map(PluginDescriptor::module_source)
            .collect()
    }

    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.plugins.read().iter().map(PluginDescriptor::info).collect()
    }

    pub fn plugin_names(&self) -> Vec<String> {
        self.plugins.read().iter().map(|p| p.name.clone()).collect()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.read().iter().any(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.read().is_empty()
    }

    async fn publish(&self, event: BotEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event).await;
        }
    }
}

/// Retires the plugin, waits for its running commands, then runs its
/// teardown hook off the async workers.
async fn teardown(descriptor: &mut PluginDescriptor) {
    descriptor.alive.retire().await;
    let module = descriptor.module.clone();
    let destroyed = tokio::task::spawn_blocking(move || panic::catch_unwind(AssertUnwindSafe(|| module.destroy()))).await;
    if !matches!(destroyed, Ok(Ok(()))) {
        error!("Plugin '{}' panicked in destroy()", descriptor.name);
    }
    descriptor.state = PluginState::Destroyed;
}

/// Files in `dir` carrying the platform's shared-library extension, sorted.
fn library_files(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let ext = std::env::consts::DLL_EXTENSION;
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case(ext));
        if matches {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}
