//! In-memory `ChatPlatform` used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::*;

#[derive(Default)]
pub struct FakeState {
    pub sent: Vec<(ChannelId, OutgoingMessage)>,
    pub replies: Vec<(MessageId, String)>,
    pub deleted: Vec<(ChannelId, MessageId)>,
    pub directs: Vec<(UserId, String)>,
    pub users: HashMap<UserId, String>,
    pub channels: HashSet<ChannelId>,
    pub members: HashSet<(GuildId, UserId)>,
    pub roles: HashMap<(GuildId, String), RoleId>,
    pub guild_channels: Vec<ChannelId>,
    pub overrides: Vec<(ChannelId, RoleId)>,
    pub member_roles: Vec<(GuildId, UserId, RoleId)>,
    pub bans: Vec<(GuildId, UserId, String)>,
    /// Number of messages currently in each channel's history
    pub history: HashMap<ChannelId, usize>,
    pub fail_bans: bool,
    /// Sends whose text or card title contains this string fail
    pub fail_sends_containing: Option<String>,
    next_id: u64,
}

#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<FakeState>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn with_user(self, id: UserId, tag: &str) -> Self {
        self.state().users.insert(id, tag.to_string());
        self
    }

    pub fn with_channel(self, id: ChannelId) -> Self {
        self.state().channels.insert(id);
        self
    }

    pub fn with_member(self, guild: GuildId, user: UserId, tag: &str) -> Self {
        {
            let mut state = self.state();
            state.members.insert((guild, user));
            state.users.insert(user, tag.to_string());
        }
        self
    }

    pub fn with_history(self, channel: ChannelId, messages: usize) -> Self {
        self.state().history.insert(channel, messages);
        self
    }

    /// Plain-text messages posted to `channel`, in order
    pub fn texts_in(&self, channel: ChannelId) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter(|(c, _)| *c == channel)
            .filter_map(|(_, m)| match m {
                OutgoingMessage::Text(t) => Some(t.clone()),
                OutgoingMessage::Card(_) => None,
            })
            .collect()
    }

    fn next_id(state: &mut FakeState) -> MessageId {
        state.next_id += 1;
        state.next_id
    }
}

pub fn message(author: UserId, channel: ChannelId, text: &str) -> IncomingMessage {
    IncomingMessage {
        id: 9_000 + text.len() as u64,
        channel_id: channel,
        guild_id: Some(1),
        author: Author {
            id: author,
            tag: format!("user{}", author),
            is_bot: false,
            is_self: false,
        },
        text: text.to_string(),
        mentions: Vec::new(),
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    async fn send(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> Result<SentMessage, PlatformError> {
        let mut state = self.state();
        if let Some(needle) = &state.fail_sends_containing {
            let body = match &message {
                OutgoingMessage::Text(t) => t,
                OutgoingMessage::Card(c) => &c.title,
            };
            if body.contains(needle.as_str()) {
                return Err(PlatformError::Http("Missing Permissions".to_string()));
            }
        }
        let id = Self::next_id(&mut state);
        state.sent.push((channel, message));
        Ok(SentMessage { channel_id: channel, id })
    }

    async fn reply(&self, to: &IncomingMessage, text: &str) -> Result<SentMessage, PlatformError> {
        let mut state = self.state();
        let id = Self::next_id(&mut state);
        state.replies.push((to.id, text.to_string()));
        Ok(SentMessage {
            channel_id: to.channel_id,
            id,
        })
    }

    async fn delete(&self, channel: ChannelId, message: MessageId) -> Result<(), PlatformError> {
        self.state().deleted.push((channel, message));
        Ok(())
    }

    async fn resolve_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        if self.state().channels.contains(&channel) {
            Ok(())
        } else {
            Err(PlatformError::NotFound("channel"))
        }
    }

    async fn fetch_user(&self, user: UserId) -> Result<UserProfile, PlatformError> {
        self.state()
            .users
            .get(&user)
            .map(|tag| UserProfile {
                id: user,
                tag: tag.clone(),
            })
            .ok_or(PlatformError::NotFound("user"))
    }

    async fn send_direct(&self, user: UserId, text: &str) -> Result<(), PlatformError> {
        self.state().directs.push((user, text.to_string()));
        Ok(())
    }

    async fn fetch_member(
        &self,
        guild: GuildId,
        user: UserId,
    ) -> Result<UserProfile, PlatformError> {
        let state = self.state();
        if !state.members.contains(&(guild, user)) {
            return Err(PlatformError::NotFound("member"));
        }
        Ok(UserProfile {
            id: user,
            tag: state.users.get(&user).cloned().unwrap_or_default(),
        })
    }

    async fn purge(
        &self,
        channel: ChannelId,
        limit: Option<usize>,
    ) -> Result<usize, PlatformError> {
        let mut state = self.state();
        let available = state.history.get(&channel).copied().unwrap_or(0);
        let removed = limit.map_or(available, |n| n.min(available));
        state.history.insert(channel, available - removed);
        Ok(removed)
    }

    async fn find_role(&self, guild: GuildId, name: &str) -> Result<Option<RoleId>, PlatformError> {
        Ok(self.state().roles.get(&(guild, name.to_string())).copied())
    }

    async fn create_role(&self, guild: GuildId, name: &str) -> Result<RoleId, PlatformError> {
        let mut state = self.state();
        let id = 500 + state.roles.len() as u64;
        state.roles.insert((guild, name.to_string()), id);
        Ok(id)
    }

    async fn guild_channels(&self, _guild: GuildId) -> Result<Vec<ChannelId>, PlatformError> {
        Ok(self.state().guild_channels.clone())
    }

    async fn deny_send_messages(
        &self,
        channel: ChannelId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.state().overrides.push((channel, role));
        Ok(())
    }

    async fn add_role(
        &self,
        guild: GuildId,
        user: UserId,
        role: RoleId,
    ) -> Result<(), PlatformError> {
        self.state().member_roles.push((guild, user, role));
        Ok(())
    }

    async fn ban(&self, guild: GuildId, user: UserId, reason: &str) -> Result<(), PlatformError> {
        let mut state = self.state();
        if state.fail_bans {
            return Err(PlatformError::Http("Missing Permissions".to_string()));
        }
        state.bans.push((guild, user, reason.to_string()));
        Ok(())
    }
}
