//! One-line system events reported with the zone they happened in.

use std::sync::Arc;

use async_trait::async_trait;
use fancy_regex::Regex;
use tracing::debug;

use crate::common::{Channel, LogLine};
use crate::dispatch::handler::{captures, group, pattern, LogHandler};
use crate::handlers::zone::ZoneTracker;
use crate::output::OutputSink;

/// `--Bobby has looted a Cloth Cap.--` and the log owner's own loot.
pub struct LootHandler {
    character: String,
    zone: Arc<ZoneTracker>,
    sink: Arc<dyn OutputSink>,
    loot_re: Regex,
}

impl LootHandler {
    pub fn new(character: &str, zone: Arc<ZoneTracker>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            character: character.to_string(),
            zone,
            sink,
            loot_re: pattern(r"^--(\w+) (?:has|have) looted (?:an? )?(.+?)\.--$"),
        }
    }
}

#[async_trait]
impl LogHandler for LootHandler {
    fn name(&self) -> &'static str {
        "loot"
    }

    fn output_channel(&self) -> &str {
        "loot"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System {
            return Ok(());
        }
        let (player, item) = match captures(&self.loot_re, &line.text) {
            Some(caps) => (group(&caps, 1).to_string(), group(&caps, 2).to_string()),
            None => return Ok(()),
        };
        let player = if player == "You" { self.character.clone() } else { player };

        let zone = self.zone.describe().await;
        debug!("{} looted {}", player, item);
        self.sink
            .write(self.output_channel(), &format!("{} looted {} in {}", player, item, zone))
            .await;
        Ok(())
    }
}

/// `Bobby has gone Linkdead.`
pub struct LinkdeadHandler {
    zone: Arc<ZoneTracker>,
    sink: Arc<dyn OutputSink>,
    linkdead_re: Regex,
}

impl LinkdeadHandler {
    pub fn new(zone: Arc<ZoneTracker>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            zone,
            sink,
            linkdead_re: pattern(r"^(\w+) has gone Linkdead\.$"),
        }
    }
}

#[async_trait]
impl LogHandler for LinkdeadHandler {
    fn name(&self) -> &'static str {
        "linkdead"
    }

    fn output_channel(&self) -> &str {
        "linkdead"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System {
            return Ok(());
        }
        let player = match captures(&self.linkdead_re, &line.text) {
            Some(caps) => group(&caps, 1).to_string(),
            None => return Ok(()),
        };

        let zone = self.zone.describe().await;
        self.sink
            .write(self.output_channel(), &format!("{} has gone linkdead in {}", player, zone))
            .await;
        Ok(())
    }
}

/// `You receive a character flag!`
pub struct FlagHandler {
    character: String,
    zone: Arc<ZoneTracker>,
    sink: Arc<dyn OutputSink>,
}

impl FlagHandler {
    pub const FLAG_TEXT: &'static str = "You receive a character flag!";

    pub fn new(character: &str, zone: Arc<ZoneTracker>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            character: character.to_string(),
            zone,
            sink,
        }
    }
}

#[async_trait]
impl LogHandler for FlagHandler {
    fn name(&self) -> &'static str {
        "flag"
    }

    fn output_channel(&self) -> &str {
        "flags"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System || line.text.trim() != Self::FLAG_TEXT {
            return Ok(());
        }

        let zone = self.zone.describe().await;
        self.sink
            .write(
                self.output_channel(),
                &format!("{} received a flag in {}", self.character, zone),
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;
    use chrono::NaiveDate;

    fn line(text: &str) -> LogLine {
        let ts = NaiveDate::from_ymd_opt(2026, 10, 19)
            .unwrap()
            .and_hms_opt(21, 0, 0)
            .unwrap();
        LogLine::system(ts, text)
    }

    async fn in_sky() -> Arc<ZoneTracker> {
        let zone = Arc::new(ZoneTracker::new());
        zone.set("Plane of Sky").await;
        zone
    }

    #[tokio::test]
    async fn test_loot_lines() {
        let sink = Arc::new(MemorySink::new());
        let handler = LootHandler::new("Bidmaster", in_sky().await, sink.clone());

        handler.handle(&line("--Bobby has looted a Cloth Cap.--")).await.unwrap();
        handler.handle(&line("--Anna has looted an Orb of Frost.--")).await.unwrap();
        handler.handle(&line("--You have looted a Bone Chips.--")).await.unwrap();
        handler.handle(&line("Bobby has looted nothing")).await.unwrap();

        assert_eq!(
            sink.lines("loot"),
            vec![
                "Bobby looted Cloth Cap in Plane of Sky",
                "Anna looted Orb of Frost in Plane of Sky",
                "Bidmaster looted Bone Chips in Plane of Sky",
            ]
        );
    }

    #[tokio::test]
    async fn test_loot_before_any_zone() {
        let sink = Arc::new(MemorySink::new());
        let handler = LootHandler::new("Bidmaster", Arc::new(ZoneTracker::new()), sink.clone());

        handler.handle(&line("--Bobby has looted a Cloth Cap.--")).await.unwrap();
        assert_eq!(sink.lines("loot"), vec!["Bobby looted Cloth Cap in an unknown zone"]);
    }

    #[tokio::test]
    async fn test_linkdead() {
        let sink = Arc::new(MemorySink::new());
        let handler = LinkdeadHandler::new(in_sky().await, sink.clone());

        handler.handle(&line("Bobby has gone Linkdead.")).await.unwrap();
        assert_eq!(sink.lines("linkdead"), vec!["Bobby has gone linkdead in Plane of Sky"]);
    }

    #[tokio::test]
    async fn test_flag() {
        let sink = Arc::new(MemorySink::new());
        let handler = FlagHandler::new("Bidmaster", in_sky().await, sink.clone());

        handler.handle(&line("You receive a character flag!")).await.unwrap();
        handler.handle(&line("You receive 12 platinum.")).await.unwrap();
        assert_eq!(sink.lines("flags"), vec!["Bidmaster received a flag in Plane of Sky"]);
    }
}
