//! Output sinks handlers write their results to.

pub mod discord;
pub mod sink;

pub use discord::DiscordSink;
pub use sink::{chunk_message, MemorySink, OutputSink};
