//! Bid eligibility tiers.
//!
//! A player's tier is derived from their guild rank, alt flag and public note
//! every time the roster changes. It is never stored on its own.

use std::fmt;

use crate::config::types::RankConfig;

/// Eligibility tier, ordered from lowest to highest bid priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    Inactive,
    Social,
    Alt,
    Recruit,
    SecondMain,
    Main,
}

impl Tier {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Inactive => "Inactive",
            Self::Social => "Social",
            Self::Alt => "Alt",
            Self::Recruit => "Recruit",
            Self::SecondMain => "Second Main",
            Self::Main => "Main",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Rank labels that drive tiering.
#[derive(Debug, Clone)]
pub struct TierRules {
    /// Leadership, officer and raider ranks.
    main_ranks: Vec<String>,
    recruit: String,
    social: String,
    inactive: String,
}

impl TierRules {
    pub fn from_config(config: &RankConfig) -> Self {
        Self {
            main_ranks: config.main.clone(),
            recruit: config.recruit.clone(),
            social: config.social.clone(),
            inactive: config.inactive.clone(),
        }
    }

    /// Compute a tier. First matching rule wins; anything unrecognized is Inactive.
    ///
    /// Ranks must match a configured label exactly (apart from surrounding
    /// whitespace). Only the second-main note marker ignores case.
    pub fn tier(&self, rank: &str, is_alt: bool, public_note: &str) -> Tier {
        let rank = rank.trim();
        let is_main_rank = self.main_ranks.iter().any(|r| r == rank);

        if rank == self.inactive {
            Tier::Inactive
        } else if !is_alt && is_main_rank {
            Tier::Main
        } else if is_alt && is_main_rank && has_second_main_marker(public_note) {
            Tier::SecondMain
        } else if rank == self.recruit {
            Tier::Recruit
        } else if is_alt {
            Tier::Alt
        } else if rank == self.social {
            Tier::Social
        } else {
            Tier::Inactive
        }
    }
}

impl Default for TierRules {
    fn default() -> Self {
        Self::from_config(&RankConfig::default())
    }
}

/// Tier a player using the default rank labels.
pub fn tier(rank: &str, is_alt: bool, public_note: &str) -> Tier {
    TierRules::default().tier(rank, is_alt, public_note)
}

/// Public notes mark second mains as "2nd Main", "2nd main", "2ND MAIN", ...
fn has_second_main_marker(public_note: &str) -> bool {
    public_note.to_lowercase().contains("nd main")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inactive_rank_wins() {
        assert_eq!(tier("Inactive", false, ""), Tier::Inactive);
        assert_eq!(tier("Inactive", true, "2nd Main"), Tier::Inactive);
    }

    #[test]
    fn test_main_ranks() {
        for rank in ["Leader", "Officer", "Raider"] {
            assert_eq!(tier(rank, false, ""), Tier::Main, "rank {}", rank);
        }
    }

    #[test]
    fn test_second_main_marker_is_case_insensitive() {
        assert_eq!(tier("Raider", true, "Bob's 2nd Main"), Tier::SecondMain);
        assert_eq!(tier("Officer", true, "2nd main"), Tier::SecondMain);
        assert_eq!(tier("Leader", true, "2ND MAIN"), Tier::SecondMain);
    }

    #[test]
    fn test_second_main_needs_qualifying_rank() {
        assert_eq!(tier("Member", true, "2nd Main"), Tier::Alt);
        assert_eq!(tier("Recruit", true, "2nd Main"), Tier::Recruit);
    }

    #[test]
    fn test_alt_without_marker() {
        assert_eq!(tier("Raider", true, "box"), Tier::Alt);
        assert_eq!(tier("Member", true, ""), Tier::Alt);
    }

    #[test]
    fn test_recruit_and_social() {
        assert_eq!(tier("Recruit", false, ""), Tier::Recruit);
        assert_eq!(tier("Member", false, ""), Tier::Social);
    }

    #[test]
    fn test_unknown_rank_falls_through_to_inactive() {
        assert_eq!(tier("", false, ""), Tier::Inactive);
        assert_eq!(tier("Banker", false, ""), Tier::Inactive);
    }

    #[test]
    fn test_rank_match_is_exact() {
        assert_eq!(tier("raider", false, ""), Tier::Inactive);
        assert_eq!(tier("MEMBER", false, ""), Tier::Inactive);
        assert_eq!(tier("recruit", false, ""), Tier::Inactive);
        assert_eq!(tier("officer", true, "2nd Main"), Tier::Alt);
        assert_eq!(tier(" Raider ", false, ""), Tier::Main);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::Inactive < Tier::Social);
        assert!(Tier::Social < Tier::Alt);
        assert!(Tier::Alt < Tier::Recruit);
        assert!(Tier::Recruit < Tier::SecondMain);
        assert!(Tier::SecondMain < Tier::Main);
    }

    #[test]
    fn test_custom_rank_labels() {
        let rules = TierRules::from_config(&RankConfig {
            main: vec!["Core".to_string()],
            recruit: "Trial".to_string(),
            social: "Friend".to_string(),
            inactive: "Retired".to_string(),
        });
        assert_eq!(rules.tier("Core", false, ""), Tier::Main);
        assert_eq!(rules.tier("Raider", false, ""), Tier::Inactive);
        assert_eq!(rules.tier("Trial", false, ""), Tier::Recruit);
        assert_eq!(rules.tier("Friend", false, ""), Tier::Social);
    }
}
