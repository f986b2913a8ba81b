//! Chat front end for the bid engine.
//!
//! The log owner runs auctions from any chat channel:
//!
//! ```text
//! !bids open Cloth Cap x2 5m
//! !bids close Cloth Cap
//! ```
//!
//! Members bid by sending a tell with the item name and an amount, or
//! `cancel` to withdraw: `Cloth Cap 500`, `Cloth Cap cancel`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::auction::registry::{AuctionRegistry, AuctionSummary, ClosedAuction};
use crate::auction::resolution::{award_lines, ResolutionStrategy};
use crate::common::{Channel, LogLine};
use crate::dispatch::LogHandler;
use crate::output::OutputSink;

const COMMAND_PREFIX: &str = "!bids";

/// How often the auto-close task looks for expired auctions.
pub const AUTO_CLOSE_INTERVAL: Duration = Duration::from_secs(10);

/// A parsed auction command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BidCommand {
    Open { item: String, quantity: i64, minutes: i64 },
    Close { item: String },
    List,
}

impl BidCommand {
    /// Parse `!bids open|close|list ...`. `default_minutes` applies when no duration is given.
    pub fn parse(text: &str, default_minutes: i64) -> Option<Self> {
        let rest = text.trim().strip_prefix(COMMAND_PREFIX)?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let rest = rest.trim();
        let (action, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let action = action.to_lowercase();
        let args = args.trim();

        match action.as_str() {
            "open" => {
                let mut words: Vec<&str> = args.split_whitespace().collect();
                let mut quantity = 1;
                let mut minutes = default_minutes;

                // Quantity and duration may trail the item name in either order.
                while let Some(last) = words.last() {
                    if let Some(q) = parse_quantity(last) {
                        quantity = q;
                    } else if let Some(m) = parse_minutes(last) {
                        minutes = m;
                    } else {
                        break;
                    }
                    words.pop();
                }

                let item = words.join(" ");
                if item.is_empty() {
                    return None;
                }
                Some(Self::Open { item, quantity, minutes })
            }
            "close" if !args.is_empty() => Some(Self::Close {
                item: args.to_string(),
            }),
            "list" => Some(Self::List),
            _ => None,
        }
    }
}

fn parse_quantity(word: &str) -> Option<i64> {
    word.strip_prefix(['x', 'X'])?.parse().ok()
}

fn parse_minutes(word: &str) -> Option<i64> {
    word.strip_suffix(['m', 'M'])?.parse().ok()
}

/// A member's bid tell: item name then an amount or `cancel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BidTell {
    pub item: String,
    pub amount: i64,
}

impl BidTell {
    pub fn parse(text: &str) -> Option<Self> {
        let (item, last) = text.trim().rsplit_once(char::is_whitespace)?;
        let item = item.trim();
        if item.is_empty() {
            return None;
        }

        let amount = if last.eq_ignore_ascii_case("cancel") {
            0
        } else {
            last.parse().ok()?
        };
        Some(Self {
            item: item.to_string(),
            amount,
        })
    }
}

/// Round a requested amount down to the bid increment.
fn round_to_increment(amount: i64, increment: i64) -> i64 {
    if increment <= 1 || amount <= 0 {
        return amount;
    }
    amount - amount % increment
}

/// Text posted for `!bids list`.
pub fn format_open(open: &[AuctionSummary]) -> String {
    if open.is_empty() {
        return "No bids open".to_string();
    }
    let mut lines = vec!["Bids open:".to_string()];
    for summary in open {
        lines.push(format!(
            "  {}(x{}) until {}",
            summary.item_name,
            summary.quantity,
            summary.end.format("%H:%M:%S")
        ));
    }
    lines.join("\n")
}

/// Text posted when an auction closes.
pub fn format_closed(closed: &ClosedAuction, awards: &[String]) -> String {
    let mut lines = vec![format!(
        "Closed bids on {}(x{})",
        closed.summary.item_name, closed.summary.quantity
    )];
    if closed.bids.is_empty() {
        lines.push("  No bids".to_string());
    }
    for bid in &closed.bids {
        lines.push(format!(
            "  {} [{}] {} (bid {})",
            bid.player, bid.tier, bid.eligible, bid.requested
        ));
    }
    lines.extend(awards.iter().cloned());
    lines.join("\n")
}

pub struct AuctionHandler {
    registry: Arc<AuctionRegistry>,
    resolution: Arc<dyn ResolutionStrategy>,
    sink: Arc<dyn OutputSink>,
}

impl AuctionHandler {
    pub fn new(
        registry: Arc<AuctionRegistry>,
        resolution: Arc<dyn ResolutionStrategy>,
        sink: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            registry,
            resolution,
            sink,
        }
    }

    async fn run_command(&self, command: BidCommand, now: NaiveDateTime) {
        let message = match command {
            BidCommand::Open { item, quantity, minutes } => {
                match self.registry.open(&item, quantity, minutes, now).await {
                    Ok(summary) => format!(
                        "Bids open on {}(x{}) for {} minutes.",
                        summary.item_name,
                        summary.quantity,
                        summary.duration_minutes()
                    ),
                    Err(e) => e.to_string(),
                }
            }
            BidCommand::Close { item } => match self.registry.close(&item).await {
                Ok(closed) => self.announce(&closed),
                Err(e) => e.to_string(),
            },
            BidCommand::List => format_open(&self.registry.open_auctions().await),
        };
        self.sink.write(self.output_channel(), &message).await;
    }

    fn announce(&self, closed: &ClosedAuction) -> String {
        let resolution = self.resolution.resolve(closed);
        format_closed(closed, &award_lines(&closed.summary.item_name, &resolution))
    }

    async fn record_bid(&self, sender: &str, tell: BidTell, message: &str) {
        let amount = round_to_increment(tell.amount, self.registry.settings().increment);
        let previous = self.registry.find_bid(&tell.item, sender).await;
        if !self
            .registry
            .add_or_update_bid(&tell.item, sender, amount, message)
            .await
        {
            return;
        }
        match previous {
            Some((_, bid)) => debug!("{} changed bid on {} from {} to {}", sender, tell.item, bid.requested, amount),
            None => debug!("{} bid {} on {}", sender, amount, tell.item),
        }
    }

    /// Close every auction whose end time has passed.
    pub async fn close_expired(&self, now: NaiveDateTime) -> usize {
        let mut closed_count = 0;
        for key in self.registry.expired(now).await {
            if let Some(closed) = self.registry.close_key(key).await {
                info!("Auto-closing bids on {}", closed.summary.item_name);
                let message = self.announce(&closed);
                self.sink.write(self.output_channel(), &message).await;
                closed_count += 1;
            }
        }
        closed_count
    }
}

#[async_trait]
impl LogHandler for AuctionHandler {
    fn name(&self) -> &'static str {
        "auction"
    }

    fn output_channel(&self) -> &str {
        "auction"
    }

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()> {
        if !line.channel.is_chat() {
            return Ok(());
        }

        if line.from_self {
            let default_minutes = self.registry.settings().default_duration_minutes;
            if let Some(command) = BidCommand::parse(&line.text, default_minutes) {
                debug!("Auction command: {:?}", command);
                self.run_command(command, line.timestamp).await;
            }
            return Ok(());
        }

        if line.channel == Channel::Tell {
            if let (Some(sender), Some(tell)) = (&line.sender, BidTell::parse(&line.text)) {
                self.record_bid(sender, tell, &line.text).await;
            }
        }
        Ok(())
    }
}

/// Close expired auctions every [`AUTO_CLOSE_INTERVAL`] until shutdown.
pub async fn auto_close_task(handler: Arc<AuctionHandler>, mut shutdown_rx: watch::Receiver<bool>) {
    let mut ticker = tokio::time::interval(AUTO_CLOSE_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                handler.close_expired(Local::now().naive_local()).await;
            }
            _ = shutdown_rx.changed() => {
                info!("Auto-close task shutting down");
                break;
            }
        }
    }
}
