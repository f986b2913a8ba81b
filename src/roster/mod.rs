//! Guild roster and bid eligibility tiers.

pub mod directory;
pub mod dump;
pub mod tier;

pub use directory::{Player, RosterDirectory, RosterEntry};
pub use dump::{roster_refresh_task, GuildDumpFile, RosterSource};
pub use tier::{Tier, TierRules};
