use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{CommandContext, CommandKind};
use crate::platform::UserId;
use crate::whitelist::{CommandName, Granted, Permission, Whitelist, WhitelistError};

fn valid_commands() -> String {
    let names: Vec<String> = CommandName::ALL
        .iter()
        .map(|c| format!("`{}`", c))
        .collect();
    format!("{}, or `all`", names.join(", "))
}

pub async fn whitelist(
    ctx: &CommandContext<'_>,
    whitelist: &Mutex<Whitelist>,
    kind: CommandKind,
    user: UserId,
    command: &str,
) {
    let permission = match command.parse::<Permission>() {
        Ok(permission) => permission,
        Err(_) => {
            ctx.say(format!("❌ Unknown command. Use one of: {}.", valid_commands()))
                .await;
            return;
        }
    };
    let Ok(profile) = ctx.platform.fetch_user(user).await else {
        ctx.say("❌ User not found.").await;
        return;
    };

    let granted = whitelist
        .lock()
        .await
        .grant(ctx.message.author.id, user, permission);
    let reply = match granted {
        Ok(Granted::All) => format!(
            "✅ `{}` is now whitelisted for **all commands**.",
            profile.tag
        ),
        Ok(Granted::Command(name)) => format!(
            "✅ `{}` is now whitelisted for `{}{}`.",
            profile.tag, ctx.prefix, name
        ),
        Ok(Granted::Unchanged) => "⚠️ User already has that command.".to_string(),
        Err(_) => kind.denied_text().to_string(),
    };
    if matches!(granted, Ok(Granted::All | Granted::Command(_))) {
        info!(
            "Whitelist: {} ({}) granted {}",
            profile.tag, profile.id, permission
        );
    }
    ctx.say(reply).await;
}

pub async fn unwhitelist(
    ctx: &CommandContext<'_>,
    whitelist: &Mutex<Whitelist>,
    kind: CommandKind,
    user: UserId,
) {
    let Ok(profile) = ctx.platform.fetch_user(user).await else {
        ctx.say("❌ User not found.").await;
        return;
    };

    let revoked = whitelist.lock().await.revoke_all(ctx.message.author.id, user);
    let reply = match revoked {
        Ok(()) => {
            info!("Whitelist: {} removed", user);
            format!("✅ `{}` has been unwhitelisted.", profile.tag)
        }
        Err(WhitelistError::NotWhitelisted) => "⚠️ That user is not whitelisted.".to_string(),
        Err(_) => kind.denied_text().to_string(),
    };
    ctx.say(reply).await;
}

pub async fn list(ctx: &CommandContext<'_>, whitelist: &Mutex<Whitelist>, kind: CommandKind) {
    // snapshot so user lookups happen without holding the lock
    let listed = whitelist.lock().await.list(ctx.message.author.id);
    let entries = match listed {
        Ok(entries) => entries,
        Err(_) => {
            ctx.say(kind.denied_text()).await;
            return;
        }
    };
    if entries.is_empty() {
        ctx.say("📭 Whitelist is currently empty.").await;
        return;
    }

    let mut lines = Vec::with_capacity(entries.len());
    for (user, permissions) in entries {
        match ctx.platform.fetch_user(user).await {
            Ok(profile) => {
                let names: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
                lines.push(format!("`{}` → {}", profile.tag, names.join(", ")));
            }
            Err(e) => debug!("Skipping whitelisted user {}: {}", user, e),
        }
    }

    ctx.say(format!("**📝 Whitelisted Users:**\n{}", lines.join("\n")))
        .await;
}
