//! `!dkp <player>` lookups run by the log owner.
//!
//! `!dkp reload` asks the ledger refresh task to rebuild the cache from the
//! first row.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::common::LogLine;
use crate::dispatch::LogHandler;
use crate::dkp::{DkpCache, Standing};
use crate::output::OutputSink;
use crate::roster::RosterDirectory;

const COMMAND: &str = "!dkp";
const RELOAD: &str = "reload";

pub struct StandingHandler {
    roster: Arc<RosterDirectory>,
    dkp: Arc<DkpCache>,
    reload_tx: mpsc::Sender<()>,
    sink: Arc<dyn OutputSink>,
}

impl StandingHandler {
    pub fn new(
        roster: Arc<RosterDirectory>,
        dkp: Arc<DkpCache>,
        reload_tx: mpsc::Sender<()>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            roster,
            dkp,
            reload_tx,
            sink,
        }
    }

    fn request_reload(&self) -> &'static str {
        match self.reload_tx.try_send(()) {
            Ok(()) => "Ledger reload requested",
            Err(mpsc::error::TrySendError::Full(())) => {
                debug!("Ledger reload already pending");
                "Ledger reload already pending"
            }
            Err(mpsc::error::TrySendError::Closed(())) => "Ledger refresh is not running",
        }
    }
}

fn format_standing(name: &str, tier: &str, standing: &Standing) -> String {
    format!(
        "{} [{}]: {} DKP | 30d {} | 60d {} | 90d {} | lifetime {}",
        name,
        tier,
        standing.balance,
        standing.attendance_30,
        standing.attendance_60,
        standing.attendance_90,
        standing.attendance_lifetime
    )
}

#[async_trait]
impl LogHandler for StandingHandler {
    fn name(&self) -> &'static str {
        "standing"
    }

    fn output_channel(&self) -> &str {
        "status"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if !line.from_self {
            return Ok(());
        }
        let Some(player) = line.text.trim().strip_prefix(COMMAND) else {
            return Ok(());
        };
        if !player.starts_with(char::is_whitespace) {
            return Ok(());
        }
        let player = player.trim();
        if player.is_empty() || player.contains(char::is_whitespace) {
            return Ok(());
        }

        if player.eq_ignore_ascii_case(RELOAD) {
            let message = self.request_reload();
            self.sink.write(self.output_channel(), message).await;
            return Ok(());
        }

        let message = match self.roster.get(player).await {
            Some(member) => {
                let standing = self.dkp.standing(&member.name).await;
                format_standing(&member.name, member.tier.name(), &standing)
            }
            None => format!("{} is not on the roster", player),
        };
        self.sink.write(self.output_channel(), &message).await;
        Ok(())
    }
}
