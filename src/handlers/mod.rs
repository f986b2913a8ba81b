//! Log handlers outside the bid engine.

pub mod events;
pub mod parse;
pub mod raid_dump;
pub mod roll;
pub mod standing;
pub mod zone;

pub use events::{FlagHandler, LinkdeadHandler, LootHandler};
pub use parse::ParseHandler;
pub use raid_dump::RaidDumpHandler;
pub use roll::RollHandler;
pub use standing::StandingHandler;
pub use zone::{ZoneHandler, ZoneTracker};
