use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use alaris_common::traits::IrcConnection;
use alaris_core::config::DEFAULT_CONFIG_FILE;
use alaris_core::eventbus::EventBus;
use alaris_core::irc::{IrcClient, IrcRuntime};
use alaris_core::{AlarisBot, BotConfig};

#[derive(Parser, Debug, Clone)]
#[command(name = "alaris")]
#[command(author, version, about = "Alaris - IRC bot with hot-loadable command plugins")]
struct Args {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// IRC server host (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    #[arg(long)]
    port: Option<u16>,

    /// Connect without TLS
    #[arg(long, default_value = "false")]
    no_tls: bool,

    #[arg(long)]
    nick: Option<String>,

    /// Channel to join; may be repeated. Replaces the configured channels.
    #[arg(long = "channel")]
    channels: Vec<String>,

    #[arg(long)]
    plugin_dir: Option<String>,

    /// Command prefix, e.g. "!"
    #[arg(long)]
    prefix: Option<String>,

    /// Don't load any plugins
    #[arg(long, default_value = "false")]
    no_plugins: bool,
}

impl Args {
    fn apply(&self, config: &mut BotConfig) {
        if let Some(server) = &self.server {
            config.server = server.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.no_tls {
            config.tls = false;
        }
        if let Some(nick) = &self.nick {
            config.nickname = nick.clone();
        }
        if !self.channels.is_empty() {
            config.channels = self.channels.clone();
        }
        if let Some(dir) = &self.plugin_dir {
            config.plugin_directory = dir.clone();
        }
        if let Some(prefix) = &self.prefix {
            config.command_prefix = prefix.clone();
        }
        if self.no_plugins {
            config.load_plugins = false;
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = EnvFilter::from_default_env()
        .add_directive("alaris=info".parse()?)
        .add_directive("alaris_core=info".parse()?);
    let sub = fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(sub).context("Failed to set global subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let mut config = BotConfig::load_or_default(&args.config);
    args.apply(&mut config);
    config.ensure_nickname();
    config.validate().context("invalid configuration")?;

    info!(
        "Alaris starting. server={}:{} tls={} nick={} channels={:?}",
        config.server, config.port, config.tls, config.nickname, config.channels
    );

    let event_bus = Arc::new(EventBus::new());

    let mut client = IrcClient::connect(&config)
        .await
        .with_context(|| format!("connecting to {}:{}", config.server, config.port))?;
    let incoming = client
        .incoming
        .take()
        .context("IRC client has no incoming channel")?;
    let handle = client.handle();
    let runtime_handle = IrcRuntime::new(handle.clone(), config.channels.clone(), event_bus.clone()).spawn(incoming);

    let connection: Arc<dyn IrcConnection> = Arc::new(handle);
    let bot = AlarisBot::new(config, connection, event_bus.clone())?;
    bot.start().await;
    let dispatch_handle = bot.spawn_dispatch_loop().await;

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("Failed to listen for ctrl-c: {:?}", e);
            }
            info!("Ctrl-C received; shutting down.");
        }
        _ = runtime_handle => {
            info!("IRC connection closed; shutting down.");
        }
    }

    bot.shutdown().await;
    client.shutdown("Alaris shutting down");
    let _ = dispatch_handle.await;

    info!("Main finished. Goodbye!");
    Ok(())
}
