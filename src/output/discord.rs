//! Discord-backed output sink.
//!
//! Uses the serenity HTTP client only; no gateway connection is needed to post
//! messages into channels.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serenity::all::{ChannelId, CreateMessage, Http};
use tracing::{debug, warn};

use crate::output::sink::{chunk_message, OutputSink, MAX_CHUNK_CHARS};

/// Posts output lines to Discord channels keyed by output channel name.
pub struct DiscordSink {
    http: Arc<Http>,
    channels: HashMap<String, ChannelId>,
}

impl DiscordSink {
    pub fn new(token: &str, channels: &HashMap<String, u64>) -> Self {
        let channels = channels
            .iter()
            .map(|(key, id)| (key.clone(), ChannelId::new(*id)))
            .collect();

        Self {
            http: Arc::new(Http::new(token)),
            channels,
        }
    }
}

#[async_trait]
impl OutputSink for DiscordSink {
    async fn write(&self, channel: &str, text: &str) {
        let Some(channel_id) = self.channels.get(channel) else {
            debug!("No Discord channel mapped for '{}', dropping: {}", channel, text);
            return;
        };

        for chunk in chunk_message(text, MAX_CHUNK_CHARS) {
            let builder = CreateMessage::new().content(chunk);
            if let Err(e) = channel_id.send_message(&self.http, builder).await {
                warn!("Failed to send to Discord channel {} ({}): {}", channel, channel_id, e);
                return;
            }
        }
    }
}
