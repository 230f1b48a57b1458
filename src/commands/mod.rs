pub mod admin;
pub mod args;
pub mod moderation;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::platform::{
    ChannelId, ChatPlatform, IncomingMessage, OutgoingMessage, SentMessage, UserId,
};
use crate::whitelist::{CommandName, Whitelist};

use self::args::{ArgError, Args};

/// How long transient confirmations stay up before the bot deletes them
pub const CONFIRMATION_TTL: Duration = Duration::from_secs(5);

/// Every command the bot answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Dm,
    Msg,
    Nuke,
    Warn,
    Mute,
    Ban,
    Help,
    Whitelist,
    Unwhitelist,
    WhitelistList,
}

/// Who may run a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Whitelisted(CommandName),
    Owner,
}

impl CommandKind {
    /// Order used by the help text
    pub const ALL: [CommandKind; 10] = [
        CommandKind::Dm,
        CommandKind::Msg,
        CommandKind::Nuke,
        CommandKind::Warn,
        CommandKind::Mute,
        CommandKind::Ban,
        CommandKind::Help,
        CommandKind::Whitelist,
        CommandKind::Unwhitelist,
        CommandKind::WhitelistList,
    ];

    pub fn lookup(name: &str) -> Option<Self> {
        CommandKind::ALL.into_iter().find(|k| k.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Dm => "dm",
            CommandKind::Msg => "msg",
            CommandKind::Nuke => "nuke",
            CommandKind::Warn => "warn",
            CommandKind::Mute => "mute",
            CommandKind::Ban => "ban",
            CommandKind::Help => "command",
            CommandKind::Whitelist => "whitelist",
            CommandKind::Unwhitelist => "unwhitelist",
            CommandKind::WhitelistList => "whitelistlist",
        }
    }

    /// Argument synopsis, without the prefix
    pub fn usage(&self) -> &'static str {
        match self {
            CommandKind::Dm => "dm <user_id> <msg>",
            CommandKind::Msg => "msg <channel_id> <msg>",
            CommandKind::Nuke => "nuke <amount|all>",
            CommandKind::Warn => "warn @user <reason>",
            CommandKind::Mute => "mute @user",
            CommandKind::Ban => "ban @user <reason>",
            CommandKind::Help => "command",
            CommandKind::Whitelist => "whitelist @user <command|all>",
            CommandKind::Unwhitelist => "unwhitelist @user",
            CommandKind::WhitelistList => "whitelistlist",
        }
    }

    fn gate(&self) -> Gate {
        match self {
            CommandKind::Dm => Gate::Whitelisted(CommandName::Dm),
            CommandKind::Msg => Gate::Whitelisted(CommandName::Msg),
            CommandKind::Nuke => Gate::Whitelisted(CommandName::Nuke),
            CommandKind::Warn => Gate::Whitelisted(CommandName::Warn),
            CommandKind::Mute => Gate::Whitelisted(CommandName::Mute),
            CommandKind::Ban => Gate::Whitelisted(CommandName::Ban),
            CommandKind::Help
            | CommandKind::Whitelist
            | CommandKind::Unwhitelist
            | CommandKind::WhitelistList => Gate::Owner,
        }
    }

    pub fn denied_text(&self) -> &'static str {
        match self {
            CommandKind::Nuke | CommandKind::Warn => "🚫 Not authorized.",
            CommandKind::Whitelist => "🚫 Only the bot owner can whitelist users.",
            CommandKind::Unwhitelist => "🚫 Only the bot owner can unwhitelist users.",
            CommandKind::WhitelistList => "🚫 Only the bot owner can view the whitelist.",
            _ => "🚫 You are not authorized.",
        }
    }

    fn parse(self, text: &str) -> Result<Command, ArgError> {
        let mut args = Args::new(text);
        let command = match self {
            CommandKind::Dm => Command::Dm {
                user: args.user()?,
                message: args.required_rest("message")?.to_string(),
            },
            CommandKind::Msg => Command::Msg {
                channel: args.channel()?,
                message: args.required_rest("message")?.to_string(),
            },
            CommandKind::Nuke => Command::Nuke {
                amount: args.required("amount")?.to_string(),
            },
            CommandKind::Warn => Command::Warn {
                member: args.user()?,
                reason: args.rest().map(str::to_string),
            },
            CommandKind::Mute => Command::Mute {
                member: args.user()?,
            },
            CommandKind::Ban => Command::Ban {
                member: args.user()?,
                reason: args.rest().map(str::to_string),
            },
            CommandKind::Help => Command::Help,
            CommandKind::Whitelist => Command::Whitelist {
                user: args.user()?,
                command: args.required("command")?.to_string(),
            },
            CommandKind::Unwhitelist => Command::Unwhitelist { user: args.user()? },
            CommandKind::WhitelistList => Command::WhitelistList,
        };
        Ok(command)
    }
}

/// A command with its arguments parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Dm { user: UserId, message: String },
    Msg { channel: ChannelId, message: String },
    Nuke { amount: String },
    Warn { member: UserId, reason: Option<String> },
    Mute { member: UserId },
    Ban { member: UserId, reason: Option<String> },
    Help,
    Whitelist { user: UserId, command: String },
    Unwhitelist { user: UserId },
    WhitelistList,
}

/// `!name rest...` split into its name and argument text
#[derive(Debug, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub name: &'a str,
    pub args: &'a str,
}

pub fn parse_invocation<'a>(prefix: &str, text: &'a str) -> Option<Invocation<'a>> {
    let body = text.strip_prefix(prefix)?;
    let end = body.find(char::is_whitespace).unwrap_or(body.len());
    let (name, args) = body.split_at(end);
    if name.is_empty() {
        return None;
    }
    Some(Invocation { name, args })
}

pub fn help_text(prefix: &str) -> String {
    let mut text = String::from("** BILLA BHAI BOT COMMANDS**\n\n");
    for kind in CommandKind::ALL {
        text.push_str(&format!("`{}{}`", prefix, kind.usage()));
        if kind == CommandKind::Help {
            text.push_str(" → Show this help");
        }
        text.push('\n');
    }
    text
}

/// What a handler needs to talk back to the invoking channel
pub struct CommandContext<'a> {
    pub platform: &'a Arc<dyn ChatPlatform>,
    pub message: &'a IncomingMessage,
    pub prefix: &'a str,
}

impl CommandContext<'_> {
    /// Post to the invoking channel. Failures are logged and swallowed.
    pub async fn say(&self, text: impl Into<String>) -> Option<SentMessage> {
        let message = OutgoingMessage::Text(text.into());
        match self.platform.send(self.message.channel_id, message).await {
            Ok(sent) => Some(sent),
            Err(e) => {
                warn!(
                    "Failed to send to channel {}: {}",
                    self.message.channel_id, e
                );
                None
            }
        }
    }

    /// Post a confirmation that deletes itself after `CONFIRMATION_TTL`
    pub async fn confirm(&self, text: impl Into<String>) {
        if let Some(sent) = self.say(text).await {
            delete_later(Arc::clone(self.platform), sent, CONFIRMATION_TTL);
        }
    }
}

fn delete_later(platform: Arc<dyn ChatPlatform>, sent: SentMessage, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        if let Err(e) = platform.delete(sent.channel_id, sent.id).await {
            debug!("Failed to delete confirmation {}: {}", sent.id, e);
        }
    });
}

/// Parses prefixed commands and runs them for authorized callers
pub struct Dispatcher {
    prefix: String,
    whitelist: Mutex<Whitelist>,
}

impl Dispatcher {
    pub fn new(prefix: impl Into<String>, whitelist: Whitelist) -> Self {
        Self {
            prefix: prefix.into(),
            whitelist: Mutex::new(whitelist),
        }
    }

    #[allow(dead_code)]
    pub fn whitelist(&self) -> &Mutex<Whitelist> {
        &self.whitelist
    }

    /// Run the command in `msg`, if any. Returns the command that was
    /// recognised, whether or not it was allowed to run.
    pub async fn dispatch(
        &self,
        platform: &Arc<dyn ChatPlatform>,
        msg: &IncomingMessage,
    ) -> Option<CommandKind> {
        let invocation = parse_invocation(&self.prefix, &msg.text)?;
        let Some(kind) = CommandKind::lookup(invocation.name) else {
            debug!("Ignoring unknown command '{}'", invocation.name);
            return None;
        };

        let ctx = CommandContext {
            platform,
            message: msg,
            prefix: &self.prefix,
        };

        let allowed = {
            let whitelist = self.whitelist.lock().await;
            match kind.gate() {
                Gate::Owner => whitelist.is_owner(msg.author.id),
                Gate::Whitelisted(name) => whitelist.is_authorized(msg.author.id, name),
            }
        };
        if !allowed {
            info!(
                "Denied !{} for {} ({})",
                kind.name(),
                msg.author.tag,
                msg.author.id
            );
            ctx.say(kind.denied_text()).await;
            return Some(kind);
        }

        let command = match kind.parse(invocation.args) {
            Ok(command) => command,
            Err(e) => {
                ctx.say(format!(
                    "❌ Invalid arguments: {}. Usage: `{}{}`",
                    e,
                    self.prefix,
                    kind.usage()
                ))
                .await;
                return Some(kind);
            }
        };

        info!("{} ({}) ran !{}", msg.author.tag, msg.author.id, kind.name());
        match command {
            Command::Dm { user, message } => moderation::dm(&ctx, user, &message).await,
            Command::Msg { channel, message } => moderation::msg(&ctx, channel, &message).await,
            Command::Nuke { amount } => moderation::nuke(&ctx, &amount).await,
            Command::Warn { member, reason } => {
                moderation::warn(&ctx, member, reason.as_deref()).await
            }
            Command::Mute { member } => moderation::mute(&ctx, member).await,
            Command::Ban { member, reason } => {
                moderation::ban(&ctx, member, reason.as_deref()).await
            }
            Command::Help => {
                ctx.say(help_text(&self.prefix)).await;
            }
            Command::Whitelist { user, command } => {
                admin::whitelist(&ctx, &self.whitelist, kind, user, &command).await
            }
            Command::Unwhitelist { user } => {
                admin::unwhitelist(&ctx, &self.whitelist, kind, user).await
            }
            Command::WhitelistList => admin::list(&ctx, &self.whitelist, kind).await,
        }
        Some(kind)
    }
}
