use std::sync::Arc;

use alaris_common::models::AdminEntry;
use alaris_common::traits::{CommandContext, HandlerResult};

use crate::auth::AdminList;

/// `admin <list | add user nick host | delete user>`
pub async fn handle_admin(admins: Arc<AdminList>, ctx: CommandContext, args: [Option<String>; 4]) -> HandlerResult {
    let [action, user, nick, host] = args;

    let Some(action) = action.filter(|a| !a.is_empty()) else {
        ctx.reply("Sub-commands: list | delete | add");
        return Ok(());
    };

    match (action.to_lowercase().as_str(), user, nick, host) {
        ("add", Some(user), Some(nick), Some(host)) => {
            let reply = format!("Admin {nick} has been added.");
            admins.add(AdminEntry { user, nick, host });
            ctx.reply(&reply);
        }
        ("list", ..) => {
            let all = admins.list();
            if all.is_empty() {
                ctx.reply("No admins.");
            }
            for admin in all {
                ctx.reply(&admin.to_string());
            }
        }
        ("delete", Some(user), ..) => {
            admins.remove(&user);
            ctx.reply(&format!("Admin {user} deleted."));
        }
        _ => {}
    }
    Ok(())
}
