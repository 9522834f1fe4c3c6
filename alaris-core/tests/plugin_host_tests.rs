// tests/plugin_host_tests.rs

mod test_utils;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use alaris_common::models::{CommandBinding, PluginState};
use alaris_common::plugin::{AlarisPlugin, PluginBox};
use alaris_common::traits::{CommandModule, IrcConnection, Registrar, Routine};
use alaris_core::Error;
use alaris_core::auth::AdminList;
use alaris_core::commands::{CommandRegistry, DispatchOutcome, Dispatcher};
use alaris_core::eventbus::{BotEvent, EventBus};
use alaris_core::plugins::{LibraryLoader, PluginHost};

use test_utils::{bob, touch_library, FakeLoader, FakePlugin, PluginProbe, RecordingConnection};

fn fake(name: &'static str, probe: &Arc<PluginProbe>) -> impl Fn() -> Result<PluginBox, Error> + Send + Sync + 'static {
    let probe = probe.clone();
    move || Ok(Box::new(FakePlugin::new(name, probe.clone())) as PluginBox)
}

#[tokio::test]
async fn loads_good_plugins_and_skips_bad_ones() {
    let dir = tempfile::tempdir().unwrap();
    for stem in ["alpha", "broken", "grumpy", "omega"] {
        touch_library(dir.path(), stem);
    }
    std::fs::write(dir.path().join("readme.txt"), b"not a plugin").unwrap();

    let probe = Arc::new(PluginProbe::default());
    let grumpy_probe = probe.clone();
    let loader = FakeLoader::new()
        .with("alpha", fake("alpha", &probe))
        .with("omega", fake("omega", &probe))
        .with("grumpy", move || Ok(Box::new(FakePlugin::new("grumpy", grumpy_probe.clone()).failing_setup()) as PluginBox));

    let host = PluginHost::new(Arc::new(loader), RecordingConnection::new(), vec!["#alaris".into()]);
    let added = host.load_plugins_from_directory(dir.path()).await;

    assert_eq!(added, vec!["alpha", "omega"]);
    assert_eq!(host.plugin_names(), vec!["alpha", "omega"]);
    // alpha, grumpy and omega all had setup called; grumpy refused
    assert_eq!(probe.setups.load(Ordering::SeqCst), 3);
    assert!(!host.is_loaded("grumpy"));
    assert!(host.plugin_infos().iter().all(|p| p.state == PluginState::Loaded));
}

#[tokio::test]
async fn duplicate_names_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "a_first");
    touch_library(dir.path(), "b_second");

    let probe = Arc::new(PluginProbe::default());
    let loader = FakeLoader::new()
        .with("a_first", fake("same", &probe))
        .with("b_second", fake("same", &probe));
    let host = PluginHost::new(Arc::new(loader), RecordingConnection::new(), vec![]);

    assert_eq!(host.load_plugins_from_directory(dir.path()).await, vec!["same"]);
    assert_eq!(probe.setups.load(Ordering::SeqCst), 1);

    // loading the same directory again adds nothing
    assert!(host.load_plugins_from_directory(dir.path()).await.is_empty());
    assert_eq!(host.len(), 1);
}

#[tokio::test]
async fn unload_destroys_once_and_removes() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "x");
    let probe = Arc::new(PluginProbe::default());
    let host = PluginHost::new(
        Arc::new(FakeLoader::new().with("x", fake("x", &probe))),
        RecordingConnection::new(),
        vec![],
    );
    host.load_plugins_from_directory(dir.path()).await;
    let sources = host.command_modules();
    assert_eq!(sources.len(), 1);

    let info = host.unload_plugin("x").await.expect("x was loaded");
    assert_eq!(info.state, PluginState::Destroyed);
    assert_eq!(probe.destroys.load(Ordering::SeqCst), 1);
    assert!(!host.is_loaded("x"));
    assert!(host.command_modules().is_empty());
    // sources handed out earlier now report the module as dead
    assert!(!sources[0].is_alive());

    assert!(host.unload_plugin("x").await.is_none());
    assert!(host.unload_plugin("never-loaded").await.is_none());
    assert_eq!(probe.destroys.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unload_all_and_lifecycle_events() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "one");
    touch_library(dir.path(), "two");
    let probe = Arc::new(PluginProbe::default());
    let bus = Arc::new(EventBus::new());
    let mut events = bus.subscribe(Some(16)).await;

    let mut host = PluginHost::new(
        Arc::new(FakeLoader::new().with("one", fake("one", &probe)).with("two", fake("two", &probe))),
        RecordingConnection::new(),
        vec![],
    );
    host.set_event_bus(bus.clone());

    host.load_plugins_from_directory(dir.path()).await;
    let removed: Vec<_> = host.unload_all().await.into_iter().map(|p| p.name).collect();
    assert_eq!(removed, vec!["two", "one"]);
    assert_eq!(probe.destroys.load(Ordering::SeqCst), 2);
    assert!(host.is_empty());

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(match event {
            BotEvent::PluginLoaded { name, .. } => format!("loaded:{name}"),
            BotEvent::PluginUnloaded { name } => format!("unloaded:{name}"),
            other => other.event_type().to_string(),
        });
    }
    assert_eq!(kinds, vec!["loaded:one", "loaded:two", "unloaded:two", "unloaded:one"]);
}

#[tokio::test]
async fn real_loader_rejects_garbage_files() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "garbage");
    let host = PluginHost::new(Arc::new(LibraryLoader), RecordingConnection::new(), vec![]);

    assert!(host.load_plugins_from_directory(dir.path()).await.is_empty());
    assert!(host.is_empty());
}

#[tokio::test]
async fn concurrent_loads_keep_names_unique() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "x");
    let probe = Arc::new(PluginProbe::default());
    let host = PluginHost::new(
        Arc::new(FakeLoader::new().with("x", fake("x", &probe))),
        RecordingConnection::new(),
        vec![],
    );

    let (first, second) = tokio::join!(
        host.load_plugins_from_directory(dir.path()),
        host.load_plugins_from_directory(dir.path())
    );

    assert_eq!(first.len() + second.len(), 1);
    assert_eq!(host.plugin_names(), vec!["x"]);
    assert_eq!(probe.setups.load(Ordering::SeqCst), 1);

    host.unload_plugin("x").await.expect("x was loaded");
    assert!(host.is_empty());
}

/// Plugin whose only command naps, then notes whether `destroy` beat it.
struct NapPlugin {
    destroyed: Arc<AtomicBool>,
    ran_after_destroy: Arc<AtomicBool>,
}

impl CommandModule for NapPlugin {
    fn name(&self) -> &str {
        "nap"
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        let destroyed = self.destroyed.clone();
        let ran_after_destroy = self.ran_after_destroy.clone();
        registrar.register(
            CommandBinding::command("nap"),
            Routine::bare(move |_ctx| {
                let destroyed = destroyed.clone();
                let ran_after_destroy = ran_after_destroy.clone();
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    if destroyed.load(Ordering::SeqCst) {
                        ran_after_destroy.store(true, Ordering::SeqCst);
                    }
                    Ok(())
                }
            }),
        );
    }
}

impl AlarisPlugin for NapPlugin {
    fn setup(&mut self, _connection: Arc<dyn IrcConnection>, _channels: &[String]) -> Result<(), Error> {
        Ok(())
    }

    fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn unload_waits_for_running_commands() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "nap");
    let destroyed = Arc::new(AtomicBool::new(false));
    let ran_after_destroy = Arc::new(AtomicBool::new(false));
    let (d, r) = (destroyed.clone(), ran_after_destroy.clone());
    let loader = FakeLoader::new().with("nap", move || {
        Ok(Box::new(NapPlugin {
            destroyed: d.clone(),
            ran_after_destroy: r.clone(),
        }) as PluginBox)
    });

    let connection = RecordingConnection::new();
    let host = PluginHost::new(Arc::new(loader), connection.clone(), vec![]);
    host.load_plugins_from_directory(dir.path()).await;

    let registry = Arc::new(CommandRegistry::new());
    registry.create_mappings(host.command_modules()).await;
    let dispatcher = Arc::new(Dispatcher::new(registry, Arc::new(AdminList::new()), connection, vec![], "!"));

    let running = tokio::spawn({
        let dispatcher = dispatcher.clone();
        async move { dispatcher.dispatch(bob(), "#alaris", "!nap").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    host.unload_plugin("nap").await.expect("nap was loaded");
    assert!(destroyed.load(Ordering::SeqCst));
    assert_eq!(running.await.unwrap(), DispatchOutcome::Completed);
    assert!(!ran_after_destroy.load(Ordering::SeqCst));

    // the registry still holds the stale entry until the next rebuild
    assert_eq!(dispatcher.dispatch(bob(), "#alaris", "!nap").await, DispatchOutcome::Unknown);
}

#[tokio::test]
async fn slow_destroy_does_not_block_listing() {
    let dir = tempfile::tempdir().unwrap();
    touch_library(dir.path(), "x");
    touch_library(dir.path(), "y");
    let probe = Arc::new(PluginProbe::default());
    let slow_probe = probe.clone();
    let loader = FakeLoader::new()
        .with("x", move || {
            Ok(Box::new(FakePlugin::new("x", slow_probe.clone()).slow_destroy(Duration::from_millis(400))) as PluginBox)
        })
        .with("y", fake("y", &probe));
    let host = PluginHost::new(Arc::new(loader), RecordingConnection::new(), vec![]);
    host.load_plugins_from_directory(dir.path()).await;

    let (unloaded, (names, waited)) = tokio::join!(host.unload_plugin("x"), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let started = std::time::Instant::now();
        let names = host.plugin_names();
        (names, started.elapsed())
    });

    assert!(unloaded.is_some());
    assert_eq!(names, vec!["y"]);
    assert!(waited < Duration::from_millis(100), "listing waited {:?}", waited);
    assert_eq!(probe.destroys.load(Ordering::SeqCst), 1);
}
