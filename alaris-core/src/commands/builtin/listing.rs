use std::sync::{Arc, Weak};

use alaris_common::traits::{CommandContext, HandlerResult};

use crate::commands::registry::CommandRegistry;
use crate::plugins::PluginHost;

pub async fn handle_listcmds(registry: Weak<CommandRegistry>, ctx: CommandContext) -> HandlerResult {
    let Some(registry) = registry.upgrade() else {
        return Ok(());
    };
    let names: Vec<String> = registry
        .descriptors()
        .into_iter()
        .filter(|d| !d.is_sub_command && d.is_alive())
        .map(|d| d.command.clone())
        .collect();
    ctx.reply(&format!("Commands: {}", names.join(", ")));
    Ok(())
}

pub async fn handle_plugins(plugins: Arc<PluginHost>, ctx: CommandContext) -> HandlerResult {
    let names = plugins.plugin_names();
    if names.is_empty() {
        ctx.reply("No plugins loaded.");
    } else {
        ctx.reply(&format!("Plugins: {}", names.join(", ")));
    }
    Ok(())
}
