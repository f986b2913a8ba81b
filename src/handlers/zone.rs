//! Zone tracking.

use std::sync::Arc;

use async_trait::async_trait;
use fancy_regex::Regex;
use tokio::sync::RwLock;
use tracing::info;

use crate::common::{Channel, LogLine};
use crate::dispatch::handler::{captures, group, pattern, LogHandler};
use crate::output::OutputSink;

/// Zone name used before the first zone line is seen.
pub const UNKNOWN_ZONE: &str = "an unknown zone";

/// "You have entered ..." lines that announce an area, not a zone.
const AREA_PREFIXES: &[&str] = &["an Arena", "an area"];

/// The zone the log owner is currently in, shared by every handler that
/// reports where something happened.
#[derive(Debug, Default)]
pub struct ZoneTracker {
    current: RwLock<Option<String>>,
}

impl ZoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set(&self, zone: &str) {
        *self.current.write().await = Some(zone.to_string());
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    /// Current zone, or a placeholder when none is known yet.
    pub async fn describe(&self) -> String {
        self.current().await.unwrap_or_else(|| UNKNOWN_ZONE.to_string())
    }
}

pub struct ZoneHandler {
    zone: Arc<ZoneTracker>,
    sink: Arc<dyn OutputSink>,
    entered_re: Regex,
}

impl ZoneHandler {
    pub fn new(zone: Arc<ZoneTracker>, sink: Arc<dyn OutputSink>) -> Self {
        Self {
            zone,
            sink,
            entered_re: pattern(r"^You have entered (.+)\.$"),
        }
    }
}

#[async_trait]
impl LogHandler for ZoneHandler {
    fn name(&self) -> &'static str {
        "zone"
    }

    fn output_channel(&self) -> &str {
        "zone"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System {
            return Ok(());
        }
        let zone = match captures(&self.entered_re, &line.text) {
            Some(caps) => group(&caps, 1).to_string(),
            None => return Ok(()),
        };
        if AREA_PREFIXES.iter().any(|prefix| zone.starts_with(prefix)) {
            return Ok(());
        }

        info!("Entered {}", zone);
        self.zone.set(&zone).await;
        self.sink
            .write(self.output_channel(), &format!("Entered {}", zone))
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

    #[tokio::test]
    async fn test_zone_change_updates_tracker() {
        let zone = Arc::new(ZoneTracker::new());
        let sink = Arc::new(MemorySink::new());
        let handler = ZoneHandler::new(zone.clone(), sink.clone());

        assert_eq!(zone.describe().await, UNKNOWN_ZONE);
        handler.handle(&line("You have entered Plane of Sky.")).await.unwrap();

        assert_eq!(zone.current().await.as_deref(), Some("Plane of Sky"));
        assert_eq!(sink.lines("zone"), vec!["Entered Plane of Sky"]);
    }

    #[tokio::test]
    async fn test_other_lines_ignored() {
        let zone = Arc::new(ZoneTracker::new());
        let sink = Arc::new(MemorySink::new());
        let handler = ZoneHandler::new(zone.clone(), sink.clone());

        handler.handle(&line("You have entered an Arena (PvP) area.")).await.unwrap();
        handler
            .handle(&line("You have entered an area where levitation effects do not function."))
            .await
            .unwrap();
        handler.handle(&line("It begins to rain.")).await.unwrap();

        assert_eq!(zone.current().await, None);
        assert!(sink.written().is_empty());
    }
}
