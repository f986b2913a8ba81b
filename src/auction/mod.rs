//! The bid engine: open auctions, member bids and closing.

pub mod handler;
pub mod registry;
pub mod resolution;

pub use handler::{auto_close_task, AuctionHandler};
pub use registry::{AuctionRegistry, ClosedAuction, EligibleBid};
pub use resolution::{ManualResolution, Resolution, ResolutionStrategy};
