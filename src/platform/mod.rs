pub mod discord;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;

pub type UserId = u64;
pub type ChannelId = u64;
pub type GuildId = u64;
pub type RoleId = u64;
pub type MessageId = u64;

/// The person (or bot) who wrote a message
#[derive(Debug, Clone)]
pub struct Author {
    pub id: UserId,
    /// Display tag, e.g. `name` or `name#1234`
    pub tag: String,
    pub is_bot: bool,
    /// True when the message was written by this bot's own account
    pub is_self: bool,
}

impl Author {
    pub fn mention(&self) -> String {
        mention(self.id)
    }
}

pub fn mention(user: UserId) -> String {
    format!("<@{}>", user)
}

/// A message received from the gateway
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: MessageId,
    pub channel_id: ChannelId,
    /// `None` for direct messages
    pub guild_id: Option<GuildId>,
    pub author: Author,
    pub text: String,
    /// Users mentioned in the message
    pub mentions: Vec<UserId>,
}

#[derive(Debug, Clone)]
pub struct JoinedMember {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub tag: String,
}

/// Gateway events the bot reacts to, decoded at the platform boundary
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Ready { user_tag: String },
    MemberJoined(JoinedMember),
    MessageReceived(IncomingMessage),
}

/// A rich post: title linking somewhere, with an image underneath
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentCard {
    pub title: String,
    pub link: String,
    pub image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    Text(String),
    Card(ContentCard),
}

impl From<String> for OutgoingMessage {
    fn from(text: String) -> Self {
        OutgoingMessage::Text(text)
    }
}

impl From<&str> for OutgoingMessage {
    fn from(text: &str) -> Self {
        OutgoingMessage::Text(text.to_string())
    }
}

/// Handle to a message the bot has posted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentMessage {
    pub channel_id: ChannelId,
    pub id: MessageId,
}

#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: UserId,
    pub tag: String,
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("not in a server")]
    NotInGuild,

    #[error("{0}")]
    Http(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound(_))
    }
}

/// Everything the bot asks of the chat platform.
///
/// Discord is the production implementation; tests run the bot against an
/// in-memory double.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    async fn send(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, PlatformError>;

    /// Reply to a message, referencing it
    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<SentMessage, PlatformError>;

    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<(), PlatformError>;

    /// Check that a channel exists and is visible to the bot
    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile, PlatformError>;

    async fn send_direct(&self, user: UserId, text: &str) -> Result<(), PlatformError>;

    async fn fetch_member(&self, guild: GuildId, user: UserId)
        -> Result<UserProfile, PlatformError>;

    /// Delete the `limit` most recent messages of a channel (everything when
    /// `None`), returning how many were removed.
    async fn purge(&self, channel: ChannelId, limit: Option<usize>)
        -> Result<usize, PlatformError>;

    async fn find_role(&self, guild: GuildId, name: &str) -> Result<Option<RoleId>, PlatformError>;

    async fn create_role(&self, guild: GuildId, name: &str) -> Result<RoleId, PlatformError>;

    async fn guild_channels(&self, guild: GuildId) -> Result<Vec<ChannelId>, PlatformError>;

    /// Add a channel override that stops `role` from sending messages
    async fn deny_send_messages(&self, channel: ChannelId, role: RoleId)
        -> Result<(), PlatformError>;

    async fn add_role(&self, guild: GuildId, user: UserId, role: RoleId)
        -> Result<(), PlatformError>;

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_missing_lookups_count_as_not_found() {
        assert!(PlatformError::NotFound("member").is_not_found());
        assert!(!PlatformError::NotInGuild.is_not_found());
        assert!(!PlatformError::Http("Missing Permissions".to_string()).is_not_found());
        assert_eq!(PlatformError::NotFound("channel").to_string(), "channel not found");
    }
}
