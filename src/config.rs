use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable holding the Discord bot token
pub const TOKEN_ENV: &str = "DISCORD_TOKEN";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub memes: MemesConfig,
    #[serde(default)]
    pub keepalive: KeepaliveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DiscordConfig {
    /// The one user who can run everything and manage the whitelist
    #[serde(default = "default_owner_id")]
    pub owner_id: u64,
    #[serde(default = "default_welcome_channel_id")]
    pub welcome_channel_id: u64,
    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MemesConfig {
    #[serde(default = "default_meme_channel_id")]
    pub channel_id: u64,
    #[serde(default = "default_meme_api_url")]
    pub api_url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    /// Six-field cron expression (with seconds), evaluated in UTC
    #[serde(default = "default_meme_cron")]
    pub cron: String,
    /// Upper bound on one meme API request
    #[serde(default = "default_meme_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KeepaliveConfig {
    #[serde(default = "default_keepalive_host")]
    pub host: String,
    #[serde(default = "default_keepalive_port")]
    pub port: u16,
    #[serde(default = "default_keepalive_message")]
    pub message: String,
}

fn default_owner_id() -> u64 {
    1205486600520343582
}

fn default_welcome_channel_id() -> u64 {
    1399679493823795234
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_meme_channel_id() -> u64 {
    1399679494490427418
}

fn default_meme_api_url() -> String {
    "https://meme-api.com/gimme".to_string()
}

fn default_batch_size() -> u32 {
    20
}

fn default_meme_cron() -> String {
    // 01:30 UTC, 07:00 in India
    "0 30 1 * * *".to_string()
}

fn default_meme_timeout_secs() -> u64 {
    30
}

fn default_keepalive_host() -> String {
    "0.0.0.0".to_string()
}

fn default_keepalive_port() -> u16 {
    8080
}

fn default_keepalive_message() -> String {
    "Billa Bot is alive!".to_string()
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            owner_id: default_owner_id(),
            welcome_channel_id: default_welcome_channel_id(),
            command_prefix: default_command_prefix(),
        }
    }
}

impl Default for MemesConfig {
    fn default() -> Self {
        Self {
            channel_id: default_meme_channel_id(),
            api_url: default_meme_api_url(),
            batch_size: default_batch_size(),
            cron: default_meme_cron(),
            timeout_secs: default_meme_timeout_secs(),
        }
    }
}

impl Default for KeepaliveConfig {
    fn default() -> Self {
        Self {
            host: default_keepalive_host(),
            port: default_keepalive_port(),
            message: default_keepalive_message(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.discord.command_prefix.is_empty() {
            anyhow::bail!("discord.command_prefix must not be empty");
        }
        // throwaway job, only built to parse the schedule
        tokio_cron_scheduler::Job::new(config.memes.cron.as_str(), |_, _| {}).map_err(|e| {
            anyhow::anyhow!(
                "memes.cron '{}' is not a valid cron expression: {:?}",
                config.memes.cron,
                e
            )
        })?;
        Ok(config)
    }
}

/// Read the bot token, failing when it is unset or blank
pub fn discord_token() -> Result<String> {
    token_from(std::env::var(TOKEN_ENV).ok())
}

fn token_from(value: Option<String>) -> Result<String> {
    value
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .with_context(|| format!("{} is not set", TOKEN_ENV))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.discord.owner_id, 1205486600520343582);
        assert_eq!(config.discord.command_prefix, "!");
        assert_eq!(config.memes.batch_size, 20);
        assert_eq!(config.memes.cron, "0 30 1 * * *");
        assert_eq!(config.memes.timeout_secs, 30);
        assert_eq!(config.keepalive.port, 8080);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
[discord]
owner_id = 42
command_prefix = "?"

[memes]
batch_size = 5

[keepalive]
port = 3000
"#,
        )
        .unwrap();
        assert_eq!(config.discord.owner_id, 42);
        assert_eq!(config.discord.command_prefix, "?");
        assert_eq!(config.discord.welcome_channel_id, 1399679493823795234);
        assert_eq!(config.memes.batch_size, 5);
        assert_eq!(config.memes.api_url, "https://meme-api.com/gimme");
        assert_eq!(config.keepalive.port, 3000);
        assert_eq!(config.keepalive.host, "0.0.0.0");
    }

    #[test]
    fn test_example_config_parses() {
        let config = Config::parse(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.memes.channel_id, 1399679494490427418);
        assert_eq!(config.keepalive.message, "Billa Bot is alive!");
    }

    #[test]
    fn test_empty_prefix_rejected() {
        assert!(Config::parse("[discord]\ncommand_prefix = \"\"").is_err());
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let err = Config::parse("[memes]\ncron = \"every morning\"").unwrap_err();
        assert!(err.to_string().contains("memes.cron"));
        assert!(Config::parse("[memes]\ncron = \"0 0 9 * * *\"").is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/billabot.toml")).is_err());
    }

    #[test]
    fn test_token_must_be_present() {
        assert!(token_from(None).is_err());
        assert!(token_from(Some("   ".to_string())).is_err());
        assert_eq!(token_from(Some(" abc ".to_string())).unwrap(), "abc");
    }
}
