//! src/commands/registry.rs
//!
//! Name → handler mapping, rebuilt from scratch by scanning command modules.
//!
//! Readers take a cheap clone of the current [`MappingSnapshot`]; writers
//! build a complete replacement off to the side and swap it in, so a
//! dispatch that races a rebuild sees either the whole old table or the
//! whole new one.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::join_all;
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedRwLockReadGuard, RwLock as GateLock};
use tracing::{debug, error, info, warn};

use alaris_common::models::{Arity, CommandBinding, CommandPermission};
use alaris_common::traits::{CommandModule, Registrar, Registration, Routine};

/// Shared "is the owning module still alive" flag, plus the gate every
/// running invocation of the module holds.
#[derive(Clone)]
pub struct Liveness {
    alive: Arc<AtomicBool>,
    gate: Arc<GateLock<()>>,
}

/// Held for the whole of one invocation; teardown waits for all of them.
pub type InvocationPass = OwnedRwLockReadGuard<()>;

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

impl Liveness {
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
            gate: Arc::new(GateLock::new(())),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// `None` once the module has been retired.
    pub async fn enter(&self) -> Option<InvocationPass> {
        let pass = self.gate.clone().read_owned().await;
        self.is_alive().then_some(pass)
    }

    /// Marks the module dead and waits until no invocation is running.
    pub async fn retire(&self) {
        self.alive.store(false, Ordering::Release);
        let _drained = self.gate.write().await;
    }
}

/// A module to scan, paired with its liveness flag.
#[derive(Clone)]
pub struct ModuleSource {
    pub module: Arc<dyn CommandModule>,
    pub alive: Liveness,
}

impl ModuleSource {
    pub fn new(module: Arc<dyn CommandModule>, alive: Liveness) -> Self {
        Self { module, alive }
    }

    /// A host-internal module, alive for the whole process.
    pub fn builtin(module: Arc<dyn CommandModule>) -> Self {
        Self::new(module, Liveness::new())
    }

    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }
}

/// One accepted `(binding, routine)` pair.
#[derive(Clone)]
pub struct HandlerDescriptor {
    pub command: String,
    pub permission: CommandPermission,
    pub arity: Arity,
    pub is_sub_command: bool,
    /// Name of the module that registered it.
    pub module: String,
    routine: Routine,
    alive: Liveness,
}

impl HandlerDescriptor {
    pub fn routine(&self) -> &Routine {
        &self.routine
    }

    pub fn is_alive(&self) -> bool {
        self.alive.is_alive()
    }

    pub fn liveness(&self) -> &Liveness {
        &self.alive
    }

    pub fn key(&self) -> DescriptorKey {
        DescriptorKey {
            command: self.command.clone(),
            permission: self.permission,
            variadic: self.arity == Arity::Variadic,
        }
    }
}

impl std::fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("command", &self.command)
            .field("permission", &self.permission)
            .field("arity", &self.arity)
            .field("is_sub_command", &self.is_sub_command)
            .field("module", &self.module)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// Identity of a mapping entry; two registrations with equal keys collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DescriptorKey {
    pub command: String,
    pub permission: CommandPermission,
    pub variadic: bool,
}

/// Immutable, fully built mapping table.
#[derive(Debug, Default)]
pub struct MappingSnapshot {
    entries: HashMap<DescriptorKey, Arc<HandlerDescriptor>>,
    /// Lowercased name → the most recently inserted descriptor with that name.
    by_name: HashMap<String, Arc<HandlerDescriptor>>,
}

impl MappingSnapshot {
    fn insert(&mut self, descriptor: HandlerDescriptor) {
        let descriptor = Arc::new(descriptor);
        let key = descriptor.key();
        if let Some(previous) = self.entries.insert(key, descriptor.clone()) {
            warn!(
                command = %descriptor.command,
                previous_module = %previous.module,
                module = %descriptor.module,
                "Duplicate command binding; the later registration replaces the earlier one"
            );
        }
        self.by_name
            .insert(descriptor.command.to_lowercase(), descriptor);
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.by_name.get(&name.to_lowercase()).cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn command_count(&self) -> usize {
        self.entries.values().filter(|d| !d.is_sub_command).count()
    }

    pub fn sub_command_count(&self) -> usize {
        self.entries.values().filter(|d| d.is_sub_command).count()
    }

    /// Reachable descriptors sorted by name.
    pub fn descriptors(&self) -> Vec<Arc<HandlerDescriptor>> {
        let mut all: Vec<_> = self.by_name.values().cloned().collect();
        all.sort_by(|a, b| a.command.to_lowercase().cmp(&b.command.to_lowercase()));
        all
    }
}

/// Counts reported after a rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingStats {
    pub commands: usize,
    pub sub_commands: usize,
}

pub struct CommandRegistry {
    current: RwLock<Arc<MappingSnapshot>>,
    writer: Mutex<()>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(MappingSnapshot::default())),
            writer: Mutex::new(()),
        }
    }

    /// The currently published table.
    pub fn snapshot(&self) -> Arc<MappingSnapshot> {
        self.current.read().clone()
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<HandlerDescriptor>> {
        self.snapshot().lookup(name)
    }

    pub fn descriptors(&self) -> Vec<Arc<HandlerDescriptor>> {
        self.snapshot().descriptors()
    }

    pub fn command_count(&self) -> usize {
        self.snapshot().command_count()
    }

    pub fn sub_command_count(&self) -> usize {
        self.snapshot().sub_command_count()
    }

    /// Rebuilds the table from `sources`, in the given order. Modules are
    /// enumerated in parallel; insertion follows `sources` order so the last
    /// source wins any collision.
    pub async fn create_mappings(&self, sources: Vec<ModuleSource>) -> MappingStats {
        let _guard = self.writer.lock().await;

        let live: Vec<ModuleSource> = sources.into_iter().filter(ModuleSource::is_alive).collect();
        let scans = live.iter().map(|source| {
            let module = source.module.clone();
            tokio::task::spawn_blocking(move || scan_module(module))
        });
        let results = join_all(scans).await;

        let mut snapshot = MappingSnapshot::default();
        for (source, result) in live.iter().zip(results) {
            let registrations = match result {
                Ok(Some(registrations)) => registrations,
                Ok(None) => continue,
                Err(e) => {
                    error!("Scanning module '{}' failed: {}", source.module.name(), e);
                    continue;
                }
            };
            let module_name = source.module.name().to_string();
            for Registration { binding, routine } in registrations {
                match accept(&binding, &routine) {
                    Some(arity) => snapshot.insert(HandlerDescriptor {
                        command: binding.name.clone(),
                        permission: binding.permission,
                        arity,
                        is_sub_command: binding.is_sub_command(),
                        module: module_name.clone(),
                        routine,
                        alive: source.alive.clone(),
                    }),
                    None => debug!(
                        module = %module_name,
                        command = %binding.name,
                        declared = %binding.arity(),
                        "Skipping routine whose parameters do not match its binding"
                    ),
                }
            }
        }

        let stats = MappingStats {
            commands: snapshot.command_count(),
            sub_commands: snapshot.sub_command_count(),
        };
        *self.current.write() = Arc::new(snapshot);

        info!("Registered {} commands and {} sub-commands.", stats.commands, stats.sub_commands);
        stats
    }

    /// Publishes an empty table.
    pub async fn delete_mappings(&self) {
        let _guard = self.writer.lock().await;
        *self.current.write() = Arc::new(MappingSnapshot::default());
        info!("Cleared command mappings.");
    }
}

/// Collects a module's registrations. A module that panics while
/// registering contributes nothing.
fn scan_module(module: Arc<dyn CommandModule>) -> Option<Vec<Registration>> {
    let name = module.name().to_string();
    let scanned = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut registrar = Registrar::new(&name);
        module.register_commands(&mut registrar);
        registrar
    }));
    match scanned {
        Ok(registrar) => {
            debug!("Module '{}' registered {} routines", name, registrar.len());
            Some(registrar.into_registrations())
        }
        Err(_) => {
            error!("Module '{}' panicked while registering commands; skipping it", name);
            None
        }
    }
}

/// The arity to record for `binding`, or `None` if the routine can't serve it.
fn accept(binding: &CommandBinding, routine: &Routine) -> Option<Arity> {
    if binding.name.trim().is_empty() {
        return None;
    }
    if binding.allow_variadic {
        return routine.is_variadic().then_some(Arity::Variadic);
    }
    match routine.parameter_count() {
        Some(n) if n == binding.fixed_arity => Some(Arity::Fixed(n)),
        _ => None,
    }
}
