//! `/random` results.
//!
//! The client prints a roll as two lines: first who rolled, then the range and
//! result. The roller is held until the result line arrives.

use std::sync::Arc;

use async_trait::async_trait;
use fancy_regex::Regex;
use tokio::sync::Mutex;
use tracing::debug;

use crate::common::{Channel, LogLine};
use crate::dispatch::handler::{captures, group, pattern, LogHandler};
use crate::output::OutputSink;

pub struct RollHandler {
    sink: Arc<dyn OutputSink>,
    roller_re: Regex,
    result_re: Regex,
    pending: Mutex<Option<String>>,
}

impl RollHandler {
    pub fn new(sink: Arc<dyn OutputSink>) -> Self {
        Self {
            sink,
            roller_re: pattern(r"^\*\*A Magic Die is rolled by (\w+)\.$"),
            result_re: pattern(
                r"^\*\*It could have been any number from (\d+) to (\d+), but this time it turned up a (\d+)\.$",
            ),
            pending: Mutex::new(None),
        }
    }
}

#[async_trait]
impl LogHandler for RollHandler {
    fn name(&self) -> &'static str {
        "roll"
    }

    fn output_channel(&self) -> &str {
        "rolls"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System {
            return Ok(());
        }

        let roller = captures(&self.roller_re, &line.text).map(|caps| group(&caps, 1).to_string());
        if let Some(roller) = roller {
            *self.pending.lock().await = Some(roller);
            return Ok(());
        }

        let result = captures(&self.result_re, &line.text).map(|caps| {
            (
                group(&caps, 1).to_string(),
                group(&caps, 2).to_string(),
                group(&caps, 3).to_string(),
            )
        });
        let Some((low, high, value)) = result else {
            return Ok(());
        };

        let Some(roller) = self.pending.lock().await.take() else {
            debug!("Roll result without a roller: {}", line.text);
            return Ok(());
        };
        self.sink
            .write(
                self.output_channel(),
                &format!("{} rolled {} ({}-{})", roller, value, low, high),
            )
            .await;
        Ok(())
    }
}
