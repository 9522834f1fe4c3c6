// File: plugins/plugin_hello/src/lib.rs
//
// Example command plugin. Build it and drop the resulting library into the
// bot's plugin directory.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use alaris_common::Error;
use alaris_common::models::CommandBinding;
use alaris_common::plugin::AlarisPlugin;
use alaris_common::traits::{CommandContext, CommandModule, HandlerResult, IrcConnection, Registrar, Routine};

pub struct HelloPlugin {
    greetings: Arc<AtomicUsize>,
    channels: Vec<String>,
}

impl Default for HelloPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl HelloPlugin {
    pub fn new() -> Self {
        Self {
            greetings: Arc::new(AtomicUsize::new(0)),
            channels: Vec::new(),
        }
    }
}

async fn handle_hello(greetings: Arc<AtomicUsize>, ctx: CommandContext, [name]: [Option<String>; 1]) -> HandlerResult {
    let name = name.unwrap_or_else(|| ctx.user.nick.clone());
    let count = greetings.fetch_add(1, Ordering::Relaxed) + 1;
    ctx.reply(&format!("Hello, {name}! (greeting #{count})"));
    Ok(())
}

async fn handle_echo(ctx: CommandContext, tokens: Vec<String>) -> HandlerResult {
    if !tokens.is_empty() {
        ctx.reply(&tokens.join(" "));
    }
    Ok(())
}

impl CommandModule for HelloPlugin {
    fn name(&self) -> &str {
        "hello"
    }

    fn register_commands(&self, registrar: &mut Registrar) {
        let greetings = self.greetings.clone();
        registrar
            .register(
                CommandBinding::command("hello").with_arity(1),
                Routine::positional(move |ctx, args: [Option<String>; 1]| handle_hello(greetings.clone(), ctx, args)),
            )
            .register(CommandBinding::command("echo").variadic(), Routine::variadic(handle_echo));
    }
}

impl AlarisPlugin for HelloPlugin {
    fn setup(&mut self, _connection: Arc<dyn IrcConnection>, channels: &[String]) -> Result<(), Error> {
        self.channels = channels.to_vec();
        info!("hello plugin ready for {} channel(s)", self.channels.len());
        Ok(())
    }

    fn destroy(&self) {
        info!("hello plugin destroyed after {} greeting(s)", self.greetings.load(Ordering::Relaxed));
    }
}

alaris_common::declare_plugin!(HelloPlugin, HelloPlugin::new);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use alaris_common::models::UserIdentity;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl IrcConnection for Recorder {
        fn send_message(&self, _channel: &str, text: &str) {
            self.0.lock().unwrap().push(text.to_string());
        }
        fn join_channel(&self, _channel: &str) {}
        fn part_channel(&self, _channel: &str) {}
        fn nickname(&self) -> String {
            "alaris".into()
        }
    }

    fn context(conn: Arc<Recorder>) -> CommandContext {
        CommandContext {
            channel: "#alaris".into(),
            channels: vec!["#alaris".into()],
            connection: conn,
            user: UserIdentity::new("bob", "bobby", "bob.host"),
        }
    }

    #[test]
    fn registers_hello_and_echo() {
        let plugin = HelloPlugin::new();
        let mut registrar = Registrar::new(plugin.name());
        plugin.register_commands(&mut registrar);

        let regs = registrar.into_registrations();
        let summary: Vec<_> = regs
            .iter()
            .map(|r| (r.binding.name.clone(), r.routine.parameter_count()))
            .collect();
        assert_eq!(summary, vec![("hello".to_string(), Some(1)), ("echo".to_string(), None)]);
    }

    #[tokio::test]
    async fn hello_defaults_to_sender_nick() {
        let conn = Arc::new(Recorder::default());
        let greetings = Arc::new(AtomicUsize::new(0));

        handle_hello(greetings.clone(), context(conn.clone()), [None]).await.unwrap();
        handle_hello(greetings, context(conn.clone()), [Some("world".into())]).await.unwrap();

        assert_eq!(
            conn.0.lock().unwrap().clone(),
            vec!["Hello, bob! (greeting #1)", "Hello, world! (greeting #2)"]
        );
    }

    #[tokio::test]
    async fn echo_repeats_tokens() {
        let conn = Arc::new(Recorder::default());
        handle_echo(context(conn.clone()), vec!["a".into(), "b".into()]).await.unwrap();
        handle_echo(context(conn.clone()), vec![]).await.unwrap();
        assert_eq!(conn.0.lock().unwrap().clone(), vec!["a b"]);
    }

    #[test]
    fn exports_current_abi_version() {
        assert_eq!(_alaris_plugin_abi_version(), alaris_common::plugin::PLUGIN_ABI_VERSION);
    }
}
