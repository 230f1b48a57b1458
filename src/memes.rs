use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::MemesConfig;
use crate::platform::{ChannelId, ChatPlatform, ContentCard, OutgoingMessage};

#[derive(Debug, Clone, Deserialize)]
pub struct Meme {
    pub title: String,
    /// Link to the original post
    #[serde(rename = "postLink")]
    pub post_link: String,
    /// Direct image URL
    pub url: String,
}

impl Meme {
    pub fn card(&self) -> ContentCard {
        ContentCard {
            title: self.title.clone(),
            link: self.post_link.clone(),
            image_url: self.url.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MemeBatch {
    memes: Vec<Meme>,
}

pub struct MemeClient {
    client: reqwest::Client,
    api_url: String,
    batch_size: u32,
}

impl MemeClient {
    pub fn new(api_url: impl Into<String>, batch_size: u32, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build meme API client")?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            batch_size,
        })
    }

    /// Fetch one batch. Anything but a 200 yields an empty batch.
    pub async fn fetch(&self) -> Result<Vec<Meme>> {
        let url = format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.batch_size
        );
        debug!("Fetching memes from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to reach meme API")?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Meme API returned {}, skipping this batch", status);
            return Ok(Vec::new());
        }

        let batch: MemeBatch = response
            .json()
            .await
            .context("Failed to parse meme API response")?;
        Ok(batch.memes)
    }
}

/// Posts a batch of memes into one channel
pub struct MemePoster {
    client: MemeClient,
    channel_id: ChannelId,
}

impl MemePoster {
    pub fn new(client: MemeClient, channel_id: ChannelId) -> Self {
        Self { client, channel_id }
    }

    pub fn from_config(config: &MemesConfig) -> Result<Self> {
        let client = MemeClient::new(
            config.api_url.clone(),
            config.batch_size,
            Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self::new(client, config.channel_id))
    }

    /// Fetch and post one batch, returning how many memes went out. A meme
    /// that fails to post is logged and skipped.
    pub async fn post_batch(&self, platform: &dyn ChatPlatform) -> usize {
        if let Err(e) = platform.resolve_channel(self.channel_id).await {
            warn!("Meme channel {} unavailable: {}", self.channel_id, e);
            return 0;
        }

        let memes = match self.client.fetch().await {
            Ok(memes) => memes,
            Err(e) => {
                error!("Failed to fetch memes: {:#}", e);
                return 0;
            }
        };

        let mut posted = 0;
        for meme in &memes {
            match platform
                .send(self.channel_id, OutgoingMessage::Card(meme.card()))
                .await
            {
                Ok(_) => posted += 1,
                Err(e) => warn!("Failed to post meme '{}': {}", meme.title, e),
            }
        }
        info!("Posted {}/{} memes", posted, memes.len());
        posted
    }
}
