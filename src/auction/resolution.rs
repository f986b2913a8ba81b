//! Winner selection for closed auctions.
//!
//! The registry only clamps bids. Deciding who gets the item (ranking by
//! tier, tie-breaks, rot) is left to a [`ResolutionStrategy`]. The default
//! strategy selects nobody and leaves the call to the loot master.

use crate::auction::registry::ClosedAuction;

/// An item handed to a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub player: String,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No winner chosen; the bid list is reported as is.
    Unresolved,
    /// At most `quantity` awards.
    Awarded(Vec<Award>),
}

pub trait ResolutionStrategy: Send + Sync {
    fn resolve(&self, closed: &ClosedAuction) -> Resolution;
}

/// Leaves every auction for a human to resolve.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualResolution;

impl ResolutionStrategy for ManualResolution {
    fn resolve(&self, _closed: &ClosedAuction) -> Resolution {
        Resolution::Unresolved
    }
}

/// Chat lines announcing a resolution.
pub fn award_lines(item_name: &str, resolution: &Resolution) -> Vec<String> {
    match resolution {
        Resolution::Unresolved => Vec::new(),
        Resolution::Awarded(awards) => awards
            .iter()
            .map(|award| format!("{} awarded to {} for {}", item_name, award.player, award.amount))
            .collect(),
    }
}
