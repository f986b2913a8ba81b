//! Output sink abstraction.
//!
//! Handlers write human-readable lines to a named output channel ("auction",
//! "zone", ...). Delivery is best effort: sinks log failures and move on.

use std::sync::Mutex;

use async_trait::async_trait;

/// Message size limit of the chat platform, in characters.
pub const MAX_CHUNK_CHARS: usize = 1000;

/// A named-channel text sink.
#[async_trait]
pub trait OutputSink: Send + Sync {
    async fn write(&self, channel: &str, text: &str);
}

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Splits purely on character count; word boundaries are not considered.
pub fn chunk_message(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Sink that keeps everything it is given. Used in tests and dry runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    written: Mutex<Vec<(String, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(channel, text)` pairs written so far.
    pub fn written(&self) -> Vec<(String, String)> {
        self.written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    /// Lines written to one channel.
    pub fn lines(&self, channel: &str) -> Vec<String> {
        self.written()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn write(&self, channel: &str, text: &str) {
        if let Ok(mut written) = self.written.lock() {
            written.push((channel.to_string(), text.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_short_message() {
        assert_eq!(chunk_message("Hello world", 1000), vec!["Hello world"]);
    }

    #[test]
    fn test_chunk_ignores_word_boundaries() {
        assert_eq!(
            chunk_message("Hello beautiful world", 10),
            vec!["Hello beau", "tiful worl", "d"]
        );
    }

    #[test]
    fn test_chunk_counts_characters_not_bytes() {
        let text = "é".repeat(1500);
        let chunks = chunk_message(&text, MAX_CHUNK_CHARS);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 1000);
        assert_eq!(chunks[1].chars().count(), 500);
    }

    #[tokio::test]
    async fn test_memory_sink_records_by_channel() {
        let sink = MemorySink::new();
        sink.write("zone", "Entered Qeynos").await;
        sink.write("loot", "Bob looted a Cloth Cap").await;

        assert_eq!(sink.lines("zone"), vec!["Entered Qeynos"]);
        assert_eq!(sink.written().len(), 2);
    }
}
