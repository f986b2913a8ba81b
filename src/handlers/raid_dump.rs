//! `/outputfile` completions.
//!
//! Raid roster dumps are announced. Guild dumps are handed to the roster
//! refresh task so the directory picks up rank and note changes without
//! blocking log ingestion.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use fancy_regex::Regex;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::common::{Channel, LogLine};
use crate::dispatch::handler::{captures, group, pattern, LogHandler};
use crate::output::OutputSink;

/// Output files that are neither raid nor guild dumps.
const OTHER_DUMP_SUFFIXES: &[&str] = &["-Inventory.txt", "-Spellbook.txt"];

pub struct RaidDumpHandler {
    sink: Arc<dyn OutputSink>,
    /// Directory the client writes output files to.
    dump_dir: PathBuf,
    roster_tx: mpsc::Sender<PathBuf>,
    outputfile_re: Regex,
}

impl RaidDumpHandler {
    pub fn new(sink: Arc<dyn OutputSink>, dump_dir: PathBuf, roster_tx: mpsc::Sender<PathBuf>) -> Self {
        Self {
            sink,
            dump_dir,
            roster_tx,
            outputfile_re: pattern(r"^Outputfile Complete: (.+\.txt)$"),
        }
    }
}

#[async_trait]
impl LogHandler for RaidDumpHandler {
    fn name(&self) -> &'static str {
        "raid_dump"
    }

    fn output_channel(&self) -> &str {
        "raid"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if line.channel != Channel::System {
            return Ok(());
        }
        let file = match captures(&self.outputfile_re, line.text.trim()) {
            Some(caps) => group(&caps, 1).to_string(),
            None => return Ok(()),
        };

        if file.starts_with("RaidRoster") {
            info!("Raid dump written: {}", file);
            self.sink
                .write(self.output_channel(), &format!("Raid dump written: {}", file))
                .await;
            return Ok(());
        }
        if OTHER_DUMP_SUFFIXES.iter().any(|suffix| file.ends_with(suffix)) {
            return Ok(());
        }

        let path = self.dump_dir.join(&file);
        info!("Guild dump written: {}", path.display());
        if let Err(e) = self.roster_tx.try_send(path) {
            warn!("Roster refresh request dropped for {}: {}", file, e);
        }
        Ok(())
    }
}
