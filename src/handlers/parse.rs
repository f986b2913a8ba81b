//! Damage parses pasted into chat.

use std::sync::Arc;

use async_trait::async_trait;
use fancy_regex::Regex;

use crate::common::LogLine;
use crate::dispatch::handler::{captures, pattern, LogHandler};
use crate::output::OutputSink;

/// Forwards chat messages that look like a parser summary, e.g.
/// `Vulak in 212s, 1.2M @5660sdps | Bobby 300k ...`.
pub struct ParseHandler {
    character: String,
    sink: Arc<dyn OutputSink>,
    parse_re: Regex,
}

impl ParseHandler {
    pub fn new(character: &str, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            character: character.to_string(),
            sink,
            parse_re: pattern(r"^.+? in \d+s, .*\d+\s*sdps"),
        }
    }
}

#[async_trait]
impl LogHandler for ParseHandler {
    fn name(&self) -> &'static str {
        "parse"
    }

    fn output_channel(&self) -> &str {
        "parses"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if !line.channel.is_chat() || captures(&self.parse_re, &line.text).is_none() {
            return Ok(());
        }

        let sender = line.sender.as_deref().unwrap_or(&self.character);
        self.sink
            .write(self.output_channel(), &format!("{}: {}", sender, line.text))
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Channel;
    use crate::output::MemorySink;
    use chrono::NaiveDate;

    fn chat(sender: Option<&str>, text: &str) -> LogLine {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        LogLine {
            timestamp: ts,
            channel: Channel::Raid,
            sender: sender.map(str::to_string),
            from_self: sender.is_none(),
            text: text.to_string(),
            raw: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_parse_is_forwarded_with_sender() {
        let sink = Arc::new(MemorySink::new());
        let handler = ParseHandler::new("Bidmaster", sink.clone());

        let parse = "Vulak in 212s, 1.2M @5660sdps | Bobby 300k";
        handler.handle(&chat(Some("Anna"), parse)).await.unwrap();
        handler.handle(&chat(None, parse)).await.unwrap();
        handler.handle(&chat(Some("Anna"), "inc in 10s, get ready")).await.unwrap();

        assert_eq!(
            sink.lines("parses"),
            vec![format!("Anna: {}", parse), format!("Bidmaster: {}", parse)]
        );
    }

    #[tokio::test]
    async fn test_system_lines_ignored() {
        let sink = Arc::new(MemorySink::new());
        let handler = ParseHandler::new("Bidmaster", sink.clone());
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();

        handler
            .handle(&LogLine::system(ts, "Vulak in 212s, 1.2M @5660sdps"))
            .await
            .unwrap();
        assert!(sink.written().is_empty());
    }
}
