use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::Utc;
use serenity::all::{
    Cache, ChannelId as DiscordChannelId, Client, Context, CreateEmbed, CreateMessage, EditRole,
    EventHandler, GatewayIntents, GetMessages, GuildId as DiscordGuildId, Http, Member, Message,
    MessageId as DiscordMessageId, PermissionOverwrite, PermissionOverwriteType, Permissions,
    Ready, RoleId as DiscordRoleId, UserId as DiscordUserId,
};
use tracing::{debug, info};

use super::*;
use crate::bot::Bot;

/// Discord refuses to bulk-delete messages older than this
const BULK_DELETE_MAX_AGE_SECS: i64 = 14 * 24 * 60 * 60;
const HISTORY_PAGE: usize = 100;

fn api_error(err: serenity::Error) -> PlatformError {
    PlatformError::Http(err.to_string())
}

/// `ChatPlatform` backed by serenity's HTTP client and cache
pub struct DiscordPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl DiscordPlatform {
    pub fn from_context(ctx: &Context) -> Self {
        Self {
            http: Arc::clone(&ctx.http),
            cache: Arc::clone(&ctx.cache),
        }
    }

    fn cache_http(&self) -> (&Arc<Cache>, &Http) {
        (&self.cache, self.http.as_ref())
    }

    fn build(message: OutgoingMessage) -> CreateMessage {
        match message {
            OutgoingMessage::Text(text) => CreateMessage::new().content(text),
            OutgoingMessage::Card(card) => CreateMessage::new().embed(
                CreateEmbed::new()
                    .title(card.title)
                    .url(card.link)
                    .image(card.image_url),
            ),
        }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn send(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, PlatformError> {
        let sent = DiscordChannelId::new(channel)
            .send_message(&self.http, Self::build(message))
            .await
            .map_err(api_error)?;
        Ok(SentMessage {
            channel_id: channel,
            id: sent.id.get(),
        })
    }

    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<SentMessage, PlatformError> {
        let channel = DiscordChannelId::new(to.channel_id);
        let builder = CreateMessage::new()
            .content(text)
            .reference_message((channel, DiscordMessageId::new(to.id)));
        let sent = channel
            .send_message(&self.http, builder)
            .await
            .map_err(api_error)?;
        Ok(SentMessage {
            channel_id: to.channel_id,
            id: sent.id.get(),
        })
    }

    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<(), PlatformError> {
        DiscordChannelId::new(channel)
            .delete_message(&self.http, DiscordMessageId::new(message))
            .await
            .map_err(api_error)
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        DiscordChannelId::new(channel)
            .to_channel(self.cache_http())
            .await
            .map(|_| ())
            .map_err(|e| {
                debug!("Channel {} lookup failed: {}", channel, e);
                PlatformError::NotFound("channel")
            })
    }

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile, PlatformError> {
        let user = DiscordUserId::new(user)
            .to_user(self.cache_http())
            .await
            .map_err(api_error)?;
        Ok(UserProfile {
            id: user.id.get(),
            tag: user.tag(),
        })
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<(), PlatformError> {
        DiscordUserId::new(user)
            .direct_message(self.cache_http(), CreateMessage::new().content(text))
            .await
            .map(|_| ())
            .map_err(api_error)
    }

    async fn fetch_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<UserProfile, PlatformError> {
        let member = DiscordGuildId::new(guild)
            .member(self.cache_http(), DiscordUserId::new(user))
            .await
            .map_err(|e| {
                debug!("Member {} lookup in {} failed: {}", user, guild, e);
                PlatformError::NotFound("member")
            })?;
        Ok(UserProfile {
            id: member.user.id.get(),
            tag: member.user.tag(),
        })
    }

    async fn purge(
        &self,
        channel: ChannelId,
        limit: Option<usize>,
    ) -> Result<usize, PlatformError> {
        let channel = DiscordChannelId::new(channel);
        let mut remaining = limit;
        let mut before: Option<DiscordMessageId> = None;
        let mut deleted = 0;

        loop {
            let page = match remaining {
                Some(0) => break,
                Some(n) => n.min(HISTORY_PAGE),
                None => HISTORY_PAGE,
            };
            let mut query = GetMessages::new().limit(page as u8);
            if let Some(before) = before {
                query = query.before(before);
            }
            let messages = channel
                .messages(&self.http, query)
                .await
                .map_err(api_error)?;
            if messages.is_empty() {
                break;
            }
            before = messages.last().map(|m| m.id);

            let cutoff = Utc::now().timestamp() - BULK_DELETE_MAX_AGE_SECS;
            let (recent, old): (Vec<&Message>, Vec<&Message>) = messages
                .iter()
                .partition(|m| m.timestamp.unix_timestamp() > cutoff);

            match recent.as_slice() {
                [] => {}
                [single] => channel
                    .delete_message(&self.http, single.id)
                    .await
                    .map_err(api_error)?,
                many => channel
                    .delete_messages(&self.http, many.iter().map(|m| m.id))
                    .await
                    .map_err(api_error)?,
            }
            for message in old {
                channel
                    .delete_message(&self.http, message.id)
                    .await
                    .map_err(api_error)?;
            }

            deleted += messages.len();
            if let Some(n) = remaining.as_mut() {
                *n = n.saturating_sub(messages.len());
            }
            if messages.len() < page {
                break;
            }
        }

        Ok(deleted)
    }

    async fn find_role(&self, guild: GuildId, name: &str) -> Result<Option<RoleId>, PlatformError> {
        let roles = DiscordGuildId::new(guild)
            .roles(&self.http)
            .await
            .map_err(api_error)?;
        Ok(roles
            .values()
            .find(|role| role.name == name)
            .map(|role| role.id.get()))
    }

    async fn create_role(&self, guild: GuildId, name: &str) -> Result<RoleId, PlatformError> {
        let role = DiscordGuildId::new(guild)
            .create_role(self.cache_http(), EditRole::new().name(name))
            .await
            .map_err(api_error)?;
        Ok(role.id.get())
    }

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        let channels = DiscordGuildId::new(guild)
            .channels(&self.http)
            .await
            .map_err(api_error)?;
        Ok(channels.keys().map(|id| id.get()).collect())
    }

    async fn deny_send_messages(
        &self,
        channel: ChannelId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        let overwrite = PermissionOverwrite {
            allow: Permissions::empty(),
            deny: Permissions::SEND_MESSAGES,
            kind: PermissionOverwriteType::Role(DiscordRoleId::new(role)),
        };
        DiscordChannelId::new(channel)
            .create_permission(&self.http, overwrite)
            .await
            .map_err(api_error)
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.http
            .add_member_role(
                DiscordGuildId::new(guild),
                DiscordUserId::new(user),
                DiscordRoleId::new(role),
                None,
            )
            .await
            .map_err(api_error)
    }

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError> {
        DiscordGuildId::new(guild)
            .ban_with_reason(&self.http, DiscordUserId::new(user), 0, reason)
            .await
            .map_err(api_error)
    }
}

fn decode_message(ctx: &Context, msg: &Message) -> IncomingMessage {
    let own_id = ctx.cache.current_user().id;
    IncomingMessage {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|g| g.get()),
        author: Author {
            id: msg.author.id.get(),
            tag: msg.author.tag(),
            is_bot: msg.author.bot,
            is_self: msg.author.id == own_id,
        },
        text: msg.content.clone(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
    }
}

/// Turns serenity callbacks into `GatewayEvent`s for the bot
struct Handler {
    bot: Arc<Bot>,
}

impl Handler {
    async fn dispatch(&self, ctx: &Context, event: GatewayEvent) {
        let platform: Arc<dyn ChatPlatform> = Arc::new(DiscordPlatform::from_context(ctx));
        self.bot.handle(platform, event).await;
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let event = GatewayEvent::Ready {
            user_tag: ready.user.tag(),
        };
        self.dispatch(&ctx, event).await;
    }

    async fn guild_member_addition(&self, ctx: Context, new_member: Member) {
        let event = GatewayEvent::MemberJoined(JoinedMember {
            guild_id: new_member.guild_id.get(),
            user_id: new_member.user.id.get(),
            tag: new_member.user.tag(),
        });
        self.dispatch(&ctx, event).await;
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let event = GatewayEvent::MessageReceived(decode_message(&ctx, &msg));
        self.dispatch(&ctx, event).await;
    }
}

/// Connect to the gateway and run until the client stops
pub async fn run(token: &str, bot: Arc<Bot>) -> Result<()> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(token, intents)
        .event_handler(Handler { bot })
        .await
        .context("Failed to create Discord client")?;

    info!("Connecting to Discord gateway...");
    client.start().await.context("Discord client stopped")?;
    Ok(())
}
