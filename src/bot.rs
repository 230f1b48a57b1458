use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::commands::Dispatcher;
use crate::config::Config;
use crate::memes::MemePoster;
use crate::platform::{
    mention, ChannelId, ChatPlatform, GatewayEvent, IncomingMessage, JoinedMember, UserId,
};
use crate::scheduler::{DailyJob, TaskFuture};
use crate::spam::{SpamGuard, Verdict};
use crate::whitelist::Whitelist;

const OWNER_BUSY_REPLY: &str = "MALIK ABHI BUSY HAI !!";

pub fn welcome_text(member: UserId) -> String {
    format!(
        "**ᴡᴇʟᴄᴏᴍᴇ ᴛᴏ ᴏᴜʀ sᴇʀᴠᴇʀ𓂃 ✞**\n{} !!",
        mention(member)
    )
}

/// Reacts to gateway events. Owns all of the bot's in-memory state.
pub struct Bot {
    owner_id: UserId,
    welcome_channel_id: ChannelId,
    commands: Dispatcher,
    spam: Mutex<SpamGuard>,
    poster: Arc<MemePoster>,
    meme_job: DailyJob,
}

impl Bot {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_poster(
            config,
            MemePoster::from_config(&config.memes)?,
        ))
    }

    pub fn with_poster(config: &Config, poster: MemePoster) -> Self {
        let owner_id = config.discord.owner_id;
        Self {
            owner_id,
            welcome_channel_id: config.discord.welcome_channel_id,
            commands: Dispatcher::new(
                config.discord.command_prefix.clone(),
                Whitelist::new(owner_id),
            ),
            spam: Mutex::new(SpamGuard::new()),
            poster: Arc::new(poster),
            meme_job: DailyJob::new(config.memes.cron.clone(), "daily-memes"),
        }
    }

    pub fn meme_job(&self) -> &DailyJob {
        &self.meme_job
    }

    pub async fn handle(&self, platform: Arc<dyn ChatPlatform>, event: GatewayEvent) {
        match event {
            GatewayEvent::Ready { user_tag } => self.on_ready(platform, &user_tag).await,
            GatewayEvent::MemberJoined(member) => {
                self.on_member_join(platform.as_ref(), &member).await
            }
            GatewayEvent::MessageReceived(msg) => self.on_message(&platform, &msg).await,
        }
    }

    async fn on_ready(&self, platform: Arc<dyn ChatPlatform>, user_tag: &str) {
        info!("✅ Bot is online as {}", user_tag);

        let poster = Arc::clone(&self.poster);
        let task = move || -> TaskFuture {
            let poster = Arc::clone(&poster);
            let platform = Arc::clone(&platform);
            Box::pin(async move {
                poster.post_batch(platform.as_ref()).await;
            })
        };
        match self.meme_job.arm(task).await {
            Ok(Some(id)) => info!("Daily memes scheduled ({})", id),
            Ok(None) => {}
            Err(e) => error!("Failed to schedule daily memes: {:#}", e),
        }
    }

    async fn on_member_join(&self, platform: &dyn ChatPlatform, member: &JoinedMember) {
        info!(
            "{} ({}) joined guild {}",
            member.tag, member.user_id, member.guild_id
        );
        if let Err(e) = platform.resolve_channel(self.welcome_channel_id).await {
            warn!("Welcome channel {} unavailable: {}", self.welcome_channel_id, e);
            return;
        }
        if let Err(e) = platform
            .send(self.welcome_channel_id, welcome_text(member.user_id).into())
            .await
        {
            error!("❌ Failed to send welcome: {}", e);
        }
    }

    async fn on_message(&self, platform: &Arc<dyn ChatPlatform>, msg: &IncomingMessage) {
        if msg.author.is_self {
            return;
        }

        if msg.mentions.contains(&self.owner_id) {
            let reply = format!("{} {}", msg.author.mention(), OWNER_BUSY_REPLY);
            if let Err(e) = platform.reply(msg, &reply).await {
                warn!("❌ Could not reply: {}", e);
            }
        }

        let verdict = self.spam.lock().await.observe(msg.author.id, &msg.text);
        if verdict == Verdict::Duplicate {
            match platform.delete(msg.channel_id, msg.id).await {
                Ok(()) => info!("🧹 Deleted spam from {}", msg.author.tag),
                Err(e) => warn!("❌ Failed to delete spam: {}", e),
            }
            return;
        }

        // other bots never drive commands
        if msg.author.is_bot {
            return;
        }
        self.commands.dispatch(platform, msg).await;
    }
}
