use tracing::{error, info};

use super::CommandContext;
use crate::platform::{mention, ChannelId, GuildId, PlatformError, UserId};

pub const MUTED_ROLE: &str = "Muted";
const DEFAULT_REASON: &str = "No reason provided.";
/// Longest message `!msg` still sends as inline code
const INLINE_LIMIT: usize = 50;

pub async fn dm(ctx: &CommandContext<'_>, user: UserId, message: &str) {
    let sent = async {
        let profile = ctx.platform.fetch_user(user).await?;
        ctx.platform.send_direct(user, message).await?;
        Ok::<_, PlatformError>(profile)
    }
    .await;

    match sent {
        Ok(profile) => {
            ctx.confirm(format!("✅ DM sent to `{}`.", profile.tag))
                .await
        }
        Err(e) => {
            ctx.say(format!("⚠️ {}", e)).await;
        }
    }
}

/// Wrap text as inline code, or as a code block once it gets long
pub fn boxed(message: &str) -> String {
    if message.chars().count() <= INLINE_LIMIT {
        format!("`{}`", message)
    } else {
        format!("```\n{}\n```", message)
    }
}

pub async fn msg(ctx: &CommandContext<'_>, channel: ChannelId, message: &str) {
    if let Err(e) = ctx.platform.resolve_channel(channel).await {
        if e.is_not_found() {
            ctx.say("❌ Channel not found.").await;
        } else {
            ctx.say(format!("⚠️ {}", e)).await;
        }
        return;
    }

    match ctx.platform.send(channel, boxed(message).into()).await {
        Ok(_) => ctx.confirm(format!("✅ Sent to <#{}>.", channel)).await,
        Err(e) => {
            ctx.say(format!("⚠️ {}", e)).await;
        }
    }
}

pub async fn nuke(ctx: &CommandContext<'_>, amount: &str) {
    let limit = if amount.eq_ignore_ascii_case("all") {
        None
    } else {
        // one extra for the command message itself
        let Some(n) = amount.parse::<usize>().ok().and_then(|n| n.checked_add(1)) else {
            ctx.say(format!("❌ Error: `{}` is not a number.", amount))
                .await;
            return;
        };
        Some(n)
    };

    match ctx.platform.purge(ctx.message.channel_id, limit).await {
        Ok(deleted) => {
            info!(
                "Nuked {} messages in channel {}",
                deleted, ctx.message.channel_id
            );
            ctx.say(format!(
                "`Nuked {} messages by {}.`",
                deleted.saturating_sub(1),
                ctx.message.author.tag
            ))
            .await;
        }
        Err(e) => {
            ctx.say(format!("❌ Error: {}", e)).await;
        }
    }
}

/// The guild the command was sent in, after checking `member` belongs to it.
/// Tells the caller what went wrong when it does not.
async fn guild_member(ctx: &CommandContext<'_>, member: UserId) -> Option<GuildId> {
    let found = async {
        let guild = ctx.message.guild_id.ok_or(PlatformError::NotInGuild)?;
        ctx.platform.fetch_member(guild, member).await?;
        Ok::<_, PlatformError>(guild)
    }
    .await;

    match found {
        Ok(guild) => Some(guild),
        Err(PlatformError::NotInGuild) => {
            ctx.say("❌ This command only works in a server.").await;
            None
        }
        Err(e) if e.is_not_found() => {
            ctx.say("❌ Member not found.").await;
            None
        }
        Err(e) => {
            ctx.say(format!("❌ Error: {}", e)).await;
            None
        }
    }
}

pub async fn warn(ctx: &CommandContext<'_>, member: UserId, reason: Option<&str>) {
    if guild_member(ctx, member).await.is_none() {
        return;
    }
    let reason = reason.unwrap_or(DEFAULT_REASON);
    ctx.say(format!("⚠️ {} warned! Reason: `{}`", mention(member), reason))
        .await;
}

pub async fn mute(ctx: &CommandContext<'_>, member: UserId) {
    let Some(guild) = guild_member(ctx, member).await else {
        return;
    };

    let muted = async {
        let role = match ctx.platform.find_role(guild, MUTED_ROLE).await? {
            Some(role) => role,
            None => {
                let role = ctx.platform.create_role(guild, MUTED_ROLE).await?;
                info!("Created '{}' role {} in guild {}", MUTED_ROLE, role, guild);
                for channel in ctx.platform.guild_channels(guild).await? {
                    ctx.platform.deny_send_messages(channel, role).await?;
                }
                role
            }
        };
        ctx.platform.add_role(guild, member, role).await
    }
    .await;

    match muted {
        Ok(()) => {
            ctx.say(format!("{} muted.", mention(member))).await;
        }
        Err(e) => {
            ctx.say(format!("❌ Error: {}", e)).await;
        }
    }
}

pub async fn ban(ctx: &CommandContext<'_>, member: UserId, reason: Option<&str>) {
    let Some(guild) = guild_member(ctx, member).await else {
        return;
    };
    let reason = reason.unwrap_or(DEFAULT_REASON);

    match ctx.platform.ban(guild, member, reason).await {
        Ok(()) => {
            ctx.say(format!("🔨 {} banned. Reason: `{}`", mention(member), reason))
                .await;
        }
        Err(e) => {
            error!("Failed to ban {} in guild {}: {}", member, guild, e);
            ctx.say(format!("❌ Error: {}", e)).await;
        }
    }
}
