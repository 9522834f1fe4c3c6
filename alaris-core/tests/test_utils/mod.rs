// File: alaris-core/tests/test_utils/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use alaris_common::models::{CommandBinding, UserIdentity};
use alaris_common::plugin::{AlarisPlugin, PluginBox};
use alaris_common::traits::{CommandModule, IrcConnection, Registrar, Routine};
use alaris_core::Error;
use alaris_core::plugins::PluginLoader;

/// Records every outgoing PRIVMSG instead of sending it.
#[derive(Default)]
pub struct RecordingConnection {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent.lock().iter().map(|(_, text)| text.clone()).collect()
    }
}

impl IrcConnection for RecordingConnection {
    fn send_message(&self, channel: &str, text: &str) {
        self.sent.lock().push((channel.to_string(), text.to_string()));
    }

    fn join_channel(&self, _channel: &str) {}

    fn part_channel(&self, _channel: &str) {}

    fn nickname(&self) -> String {
        "alaris".to_string()
    }
}

/// Shared log of which routine ran with which arguments.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// A module whose registrations are supplied by the test.
pub struct TestModule {
    name: String,
    register: Box<dyn Fn(&mut Registrar) + Send + Sync>,
}

impl TestModule {
    pub fn new(name: &str, register: impl Fn(&mut Registrar) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            register: Box::new(register),
        })
    }
}

impl CommandModule for TestModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        (self.register)(registrar)
    }
}

/// Bare routine that appends `tag` to `log`.
pub fn tagging_routine(log: &CallLog, tag: &str) -> Routine {
    let log = log.clone();
    let tag = tag.to_string();
    Routine::bare(move |_ctx| {
        let log = log.clone();
        let tag = tag.clone();
        async move {
            log.lock().push(tag);
            Ok(())
        }
    })
}

pub fn bob() -> UserIdentity {
    UserIdentity::new("bob", "bobby", "bob.host")
}

pub fn mallory() -> UserIdentity {
    UserIdentity::new("mallory", "mal", "evil.host")
}

/// Lifecycle counters shared between a test and its fake plugins.
#[derive(Default)]
pub struct PluginProbe {
    pub setups: AtomicUsize,
    pub destroys: AtomicUsize,
    pub calls: Mutex<Vec<String>>,
}

/// In-memory plugin registering `<name>ping` (context-only) and `echo` (variadic).
pub struct FakePlugin {
    name: String,
    probe: Arc<PluginProbe>,
    fail_setup: bool,
    destroy_delay: Option<Duration>,
    set_up: AtomicBool,
}

impl FakePlugin {
    pub fn new(name: &str, probe: Arc<PluginProbe>) -> Self {
        Self {
            name: name.to_string(),
            probe,
            fail_setup: false,
            destroy_delay: None,
            set_up: AtomicBool::new(false),
        }
    }

    pub fn failing_setup(mut self) -> Self {
        self.fail_setup = true;
        self
    }

    /// Makes `destroy` block the calling thread for `delay`.
    pub fn slow_destroy(mut self, delay: Duration) -> Self {
        self.destroy_delay = Some(delay);
        self
    }
}

impl CommandModule for FakePlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        assert!(self.set_up.load(Ordering::SeqCst), "registered before setup");

        let probe = self.probe.clone();
        let tag = format!("{}:ping", self.name);
        registrar.register(
            CommandBinding::command(&format!("{}ping", self.name)),
            Routine::bare(move |ctx| {
                let probe = probe.clone();
                let tag = tag.clone();
                async move {
                    probe.calls.lock().push(tag);
                    ctx.reply("pong");
                    Ok(())
                }
            }),
        );

        let probe = self.probe.clone();
        let name = self.name.clone();
        registrar.register(
            CommandBinding::command("echo").variadic(),
            Routine::variadic(move |ctx, tokens| {
                let probe = probe.clone();
                let name = name.clone();
                async move {
                    probe.calls.lock().push(format!("{}:echo:{}", name, tokens.join(" ")));
                    ctx.reply(&tokens.join(" "));
                    Ok(())
                }
            }),
        );
    }
}

impl AlarisPlugin for FakePlugin {
    fn setup(&mut self, _connection: Arc<dyn IrcConnection>, _channels: &[String]) -> Result<(), Error> {
        self.probe.setups.fetch_add(1, Ordering::SeqCst);
        if self.fail_setup {
            return Err(Error::Plugin(format!("{} refuses to start", self.name)));
        }
        self.set_up.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn destroy(&self) {
        if let Some(delay) = self.destroy_delay {
            std::thread::sleep(delay);
        }
        self.probe.destroys.fetch_add(1, Ordering::SeqCst);
    }
}

type Factory = Box<dyn Fn() -> Result<PluginBox, Error> + Send + Sync>;

/// Resolves plugin files by file stem instead of opening them.
#[derive(Default)]
pub struct FakeLoader {
    factories: HashMap<String, Factory>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, stem: &str, factory: impl Fn() -> Result<PluginBox, Error> + Send + Sync + 'static) -> Self {
        self.factories.insert(stem.to_string(), Box::new(factory));
        self
    }
}

impl PluginLoader for FakeLoader {
    fn load(&self, path: &Path) -> Result<PluginBox, Error> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        match self.factories.get(stem) {
            Some(factory) => factory(),
            None => Err(Error::Plugin(format!("{} is not a plugin", path.display()))),
        }
    }
}

/// Creates an empty file named `<stem>.<dll extension>` in `dir`.
pub fn touch_library(dir: &Path, stem: &str) {
    let file = dir.join(format!("{}.{}", stem, std::env::consts::DLL_EXTENSION));
    std::fs::write(file, b"").expect("write plugin file");
}
