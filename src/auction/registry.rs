//! Open auctions and the bids placed on them.
//!
//! An item is either absent from the registry or has exactly one open
//! auction. Closing an auction removes it; nothing about closed auctions is
//! retained here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDateTime};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::common::error::{AuctionError, AuctionResult};
use crate::common::normalize_name;
use crate::config::types::BidConfig;
use crate::dkp::DkpCache;
use crate::items::{ItemId, ItemLookup};
use crate::roster::{RosterDirectory, Tier};

/// Longest auction window, one day.
pub const MAX_DURATION_MINUTES: i64 = 24 * 60;

/// Identity of an auctioned item.
pub type ItemKey = ItemId;

/// A player's bid within an auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    pub player: String,
    pub requested: i64,
    /// Set at close time.
    pub eligible: i64,
    /// Chat text the bid came from.
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Auction {
    pub item: ItemKey,
    pub item_name: String,
    pub quantity: u32,
    pub start: NaiveDateTime,
    /// Advisory; only acted on when auto-close is enabled.
    pub end: NaiveDateTime,
    pub second_main_as_main: bool,
    /// 0 means unlimited. Captured but not enforced.
    pub second_main_cap: i64,
    pub bids: Vec<Bid>,
}

impl Auction {
    fn summary(&self) -> AuctionSummary {
        AuctionSummary {
            item: self.item,
            item_name: self.item_name.clone(),
            quantity: self.quantity,
            start: self.start,
            end: self.end,
            second_main_as_main: self.second_main_as_main,
            second_main_cap: self.second_main_cap,
        }
    }
}

/// Auction facts without the bids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuctionSummary {
    pub item: ItemKey,
    pub item_name: String,
    pub quantity: u32,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub second_main_as_main: bool,
    pub second_main_cap: i64,
}

impl AuctionSummary {
    /// Whole minutes between start and end.
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }
}

/// A surviving bid after clamping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EligibleBid {
    pub player: String,
    pub tier: Tier,
    pub requested: i64,
    pub eligible: i64,
}

/// Result of closing an auction. Bids keep their arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedAuction {
    pub summary: AuctionSummary,
    pub bids: Vec<EligibleBid>,
}

/// The bid engine's state: every open auction keyed by item.
pub struct AuctionRegistry {
    settings: BidConfig,
    roster: Arc<RosterDirectory>,
    /// Without a ledger bids are not clamped to a balance.
    dkp: Option<Arc<DkpCache>>,
    items: Arc<dyn ItemLookup>,
    auctions: RwLock<HashMap<ItemKey, Auction>>,
}

impl AuctionRegistry {
    pub fn new(
        settings: BidConfig,
        roster: Arc<RosterDirectory>,
        dkp: Option<Arc<DkpCache>>,
        items: Arc<dyn ItemLookup>,
    ) -> Self {
        Self {
            settings,
            roster,
            dkp,
            items,
            auctions: RwLock::new(HashMap::new()),
        }
    }

    pub fn settings(&self) -> &BidConfig {
        &self.settings
    }

    /// Resolve an item name to its key and canonical name.
    fn resolve_item(&self, name: &str) -> Option<(ItemKey, String)> {
        let id = self.items.find_item_id_by_name(name.trim())?;
        let canonical = self
            .items
            .get_item_by_id(id)
            .map(|record| record.name)
            .unwrap_or_else(|| name.trim().to_string());
        Some((id, canonical))
    }

    /// Open an auction running from `now` for `minutes`.
    pub async fn open(
        &self,
        item: &str,
        quantity: i64,
        minutes: i64,
        now: NaiveDateTime,
    ) -> AuctionResult<AuctionSummary> {
        let (key, item_name) = self.resolve_item(item).ok_or_else(|| AuctionError::UnknownItem {
            name: item.trim().to_string(),
        })?;
        let quantity = u32::try_from(quantity)
            .ok()
            .filter(|q| *q >= 1)
            .ok_or(AuctionError::InvalidQuantity { quantity })?;
        let end = (1..=MAX_DURATION_MINUTES)
            .contains(&minutes)
            .then(|| Duration::try_minutes(minutes))
            .flatten()
            .and_then(|window| now.checked_add_signed(window))
            .ok_or(AuctionError::InvalidDuration { minutes })?;

        let mut auctions = self.auctions.write().await;
        if let Some(existing) = auctions.get(&key) {
            return Err(AuctionError::AlreadyOpen {
                item: existing.item_name.clone(),
                quantity: existing.quantity,
            });
        }

        let auction = Auction {
            item: key,
            item_name,
            quantity,
            start: now,
            end,
            second_main_as_main: self.settings.second_main_as_main,
            second_main_cap: self.settings.second_main_cap,
            bids: Vec::new(),
        };
        let summary = auction.summary();
        auctions.insert(key, auction);

        info!("Opened bids on {}(x{}) for {} minutes", summary.item_name, quantity, minutes);
        Ok(summary)
    }

    /// Record a bid. Ignored when the item has no open auction or the player
    /// is not on the roster. A player's later bid replaces their earlier one.
    ///
    /// Returns true when the bid was recorded.
    pub async fn add_or_update_bid(&self, item: &str, player: &str, amount: i64, message: &str) -> bool {
        let Some((key, _)) = self.resolve_item(item) else {
            return false;
        };
        if !self.roster.is_member(player).await {
            debug!("Ignoring bid from non-member {}", player);
            return false;
        }

        let mut auctions = self.auctions.write().await;
        let Some(auction) = auctions.get_mut(&key) else {
            return false;
        };

        let player = normalize_name(player);
        match find_bid_index(&auction.bids, &player) {
            Some(index) => {
                let bid = &mut auction.bids[index];
                bid.requested = amount;
                bid.message = message.to_string();
            }
            None => auction.bids.push(Bid {
                player: player.clone(),
                requested: amount,
                eligible: 0,
                message: message.to_string(),
            }),
        }
        debug!("{} bid {} on {}", player, amount, auction.item_name);
        true
    }

    /// Close an auction and clamp its bids.
    ///
    /// Cancelled bids (requested <= 0) are dropped. Each remaining bid is
    /// limited to the player's balance, and a result of zero or less is raised
    /// to the minimum bid.
    pub async fn close(&self, item: &str) -> AuctionResult<ClosedAuction> {
        let Some((key, item_name)) = self.resolve_item(item) else {
            return Err(AuctionError::NotOpen {
                item: item.trim().to_string(),
            });
        };
        let auction = self
            .auctions
            .write()
            .await
            .remove(&key)
            .ok_or(AuctionError::NotOpen { item: item_name })?;
        Ok(self.settle(auction).await)
    }

    /// Close by key. Used by the auto-close ticker.
    pub async fn close_key(&self, key: ItemKey) -> Option<ClosedAuction> {
        let auction = self.auctions.write().await.remove(&key)?;
        Some(self.settle(auction).await)
    }

    async fn settle(&self, auction: Auction) -> ClosedAuction {
        let summary = auction.summary();
        let kept: Vec<Bid> = auction
            .bids
            .into_iter()
            .filter(|bid| bid.requested > 0)
            .collect();

        let mut bids = Vec::with_capacity(kept.len());
        for bid in kept {
            let mut eligible = match &self.dkp {
                Some(dkp) => bid.requested.min(dkp.balance(&bid.player).await.floor() as i64),
                None => bid.requested,
            };
            if eligible <= 0 {
                eligible = self.settings.min_bid;
            }
            let tier = self
                .roster
                .get(&bid.player)
                .await
                .map(|player| player.tier)
                .unwrap_or(Tier::Inactive);

            bids.push(EligibleBid {
                player: bid.player,
                tier,
                requested: bid.requested,
                eligible,
            });
        }

        info!("Closed bids on {}(x{}) with {} bids", summary.item_name, summary.quantity, bids.len());
        ClosedAuction { summary, bids }
    }

    /// Position of the player's bid in the auction for `item`, with a copy of it.
    pub async fn find_bid(&self, item: &str, player: &str) -> Option<(usize, Bid)> {
        let (key, _) = self.resolve_item(item)?;
        let auctions = self.auctions.read().await;
        let bids = &auctions.get(&key)?.bids;
        find_bid_index(bids, player).map(|index| (index, bids[index].clone()))
    }

    /// Auctions whose end time is at or before `now`.
    pub async fn expired(&self, now: NaiveDateTime) -> Vec<ItemKey> {
        self.auctions
            .read()
            .await
            .values()
            .filter(|auction| auction.end <= now)
            .map(|auction| auction.item)
            .collect()
    }

    /// Open auctions, oldest first.
    pub async fn open_auctions(&self) -> Vec<AuctionSummary> {
        let mut open: Vec<AuctionSummary> = self
            .auctions
            .read()
            .await
            .values()
            .map(Auction::summary)
            .collect();
        open.sort_by_key(|summary| summary.start);
        open
    }
}

fn find_bid_index(bids: &[Bid], player: &str) -> Option<usize> {
    bids.iter()
        .position(|bid| bid.player.eq_ignore_ascii_case(player.trim()))
}
