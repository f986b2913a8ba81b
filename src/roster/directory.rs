//! Roster directory: the guild members known to the bot.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::common::normalize_name;
use crate::roster::tier::{Tier, TierRules};

/// One row of a roster snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub name: String,
    pub rank: String,
    pub is_alt: bool,
    pub public_note: String,
}

/// A guild member as tracked by the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub rank: String,
    pub is_alt: bool,
    pub public_note: String,
    /// Derived from the three fields above on every ingest.
    pub tier: Tier,
}

/// Counts from one roster ingest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub added: usize,
    pub updated: usize,
}

/// Shared map of guild members keyed by lower-cased name.
pub struct RosterDirectory {
    rules: TierRules,
    players: RwLock<HashMap<String, Player>>,
}

impl RosterDirectory {
    pub fn new(rules: TierRules) -> Self {
        Self {
            rules,
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Merge a roster snapshot.
    ///
    /// Known players have their rank, alt flag and note overwritten; new names
    /// are inserted. Players missing from the snapshot are left untouched.
    pub async fn ingest_roster(&self, snapshot: Vec<RosterEntry>) -> IngestSummary {
        let mut summary = IngestSummary::default();
        let mut players = self.players.write().await;

        for entry in snapshot {
            let name = normalize_name(&entry.name);
            if name.is_empty() {
                continue;
            }
            let tier = self.rules.tier(&entry.rank, entry.is_alt, &entry.public_note);

            match players.get_mut(&name.to_lowercase()) {
                Some(player) => {
                    if player.tier != tier {
                        debug!("{} moved from {} to {}", player.name, player.tier, tier);
                    }
                    player.rank = entry.rank;
                    player.is_alt = entry.is_alt;
                    player.public_note = entry.public_note;
                    player.tier = tier;
                    summary.updated += 1;
                }
                None => {
                    players.insert(
                        name.to_lowercase(),
                        Player {
                            name,
                            rank: entry.rank,
                            is_alt: entry.is_alt,
                            public_note: entry.public_note,
                            tier,
                        },
                    );
                    summary.added += 1;
                }
            }
        }

        info!(
            "Roster ingested: {} added, {} updated, {} total",
            summary.added,
            summary.updated,
            players.len()
        );
        summary
    }

    /// Look up a player by name (case-insensitive).
    pub async fn get(&self, name: &str) -> Option<Player> {
        self.players
            .read()
            .await
            .get(&name.trim().to_lowercase())
            .cloned()
    }

    pub async fn is_member(&self, name: &str) -> bool {
        self.players
            .read()
            .await
            .contains_key(&name.trim().to_lowercase())
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, rank: &str, is_alt: bool, note: &str) -> RosterEntry {
        RosterEntry {
            name: name.to_string(),
            rank: rank.to_string(),
            is_alt,
            public_note: note.to_string(),
        }
    }

    #[tokio::test]
    async fn test_ingest_inserts_and_tiers() {
        let directory = RosterDirectory::new(TierRules::default());
        let summary = directory
            .ingest_roster(vec![
                entry("bobby", "Raider", false, ""),
                entry("Anna", "Raider", true, "Bobby's 2nd Main"),
            ])
            .await;

        assert_eq!(summary, IngestSummary { added: 2, updated: 0 });
        let bobby = directory.get("BOBBY").await.unwrap();
        assert_eq!(bobby.name, "Bobby");
        assert_eq!(bobby.tier, Tier::Main);
        assert_eq!(directory.get("anna").await.unwrap().tier, Tier::SecondMain);
    }

    #[tokio::test]
    async fn test_ingest_patches_existing_and_keeps_unseen() {
        let directory = RosterDirectory::new(TierRules::default());
        directory
            .ingest_roster(vec![
                entry("Bobby", "Recruit", false, ""),
                entry("Carl", "Member", false, ""),
            ])
            .await;

        let summary = directory
            .ingest_roster(vec![entry("Bobby", "Raider", false, "promoted")])
            .await;

        assert_eq!(summary, IngestSummary { added: 0, updated: 1 });
        let bobby = directory.get("Bobby").await.unwrap();
        assert_eq!(bobby.tier, Tier::Main);
        assert_eq!(bobby.public_note, "promoted");
        assert!(directory.is_member("carl").await);
        assert_eq!(directory.len().await, 2);
    }

    #[tokio::test]
    async fn test_blank_names_are_skipped() {
        let directory = RosterDirectory::new(TierRules::default());
        directory.ingest_roster(vec![entry("  ", "Raider", false, "")]).await;
        assert_eq!(directory.len().await, 0);
    }
}
