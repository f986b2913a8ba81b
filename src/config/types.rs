//! Configuration type definitions.

use std::collections::HashMap;

use serde::Deserialize;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Name of the character whose log is being watched.
    pub character: String,
    pub log: LogConfig,
    pub discord: DiscordConfig,
    #[serde(default)]
    pub bids: BidConfig,
    #[serde(default)]
    pub ranks: RankConfig,
    pub ledger: Option<LedgerConfig>,
    pub items: ItemsConfig,
    #[serde(default)]
    pub roster: RosterConfig,
}

/// Game log location.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub path: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Discord output configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordConfig {
    pub token: String,
    /// Output channel key (e.g. "auction", "zone") -> Discord channel ID.
    #[serde(default)]
    pub channels: HashMap<String, u64>,
}

/// Bid engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BidConfig {
    /// Amount charged when a bidder's eligible amount resolves to zero or less.
    #[serde(default = "default_min_bid")]
    pub min_bid: i64,
    /// Requested amounts are rounded down to a multiple of this.
    #[serde(default = "default_increment")]
    pub increment: i64,
    #[serde(default = "default_true")]
    pub second_main_as_main: bool,
    /// Cap on second-main bids relative to mains (0 = unlimited).
    #[serde(default)]
    pub second_main_cap: i64,
    #[serde(default)]
    pub auto_close: bool,
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: i64,
}

impl Default for BidConfig {
    fn default() -> Self {
        Self {
            min_bid: default_min_bid(),
            increment: default_increment(),
            second_main_as_main: true,
            second_main_cap: 0,
            auto_close: false,
            default_duration_minutes: default_duration_minutes(),
        }
    }
}

/// Guild rank labels used for eligibility tiering.
#[derive(Debug, Clone, Deserialize)]
pub struct RankConfig {
    #[serde(default = "default_main_ranks")]
    pub main: Vec<String>,
    #[serde(default = "default_recruit_rank")]
    pub recruit: String,
    #[serde(default = "default_social_rank")]
    pub social: String,
    #[serde(default = "default_inactive_rank")]
    pub inactive: String,
}

impl Default for RankConfig {
    fn default() -> Self {
        Self {
            main: default_main_ranks(),
            recruit: default_recruit_rank(),
            social: default_social_rank(),
            inactive: default_inactive_rank(),
        }
    }
}

/// Spreadsheet-backed DKP ledger.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet")]
    pub sheet: String,
    pub api_key: String,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    /// Rebuild the whole cache after this many incremental refreshes (0 = never).
    #[serde(default = "default_full_refresh_every")]
    pub full_refresh_every: u32,
}

/// Static item/spell database.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemsConfig {
    pub path: String,
}

/// Guild roster dumps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterConfig {
    /// Directory the client writes `/outputfile` dumps to. Defaults to the folder above the log folder.
    pub dump_dir: Option<String>,
    /// Dump to load at startup, if any.
    pub initial_dump: Option<String>,
}

fn default_poll_interval_ms() -> u64 {
    250
}

fn default_min_bid() -> i64 {
    10
}

fn default_increment() -> i64 {
    1
}

fn default_true() -> bool {
    true
}

fn default_duration_minutes() -> i64 {
    2
}

fn default_main_ranks() -> Vec<String> {
    vec![
        "Leader".to_string(),
        "Officer".to_string(),
        "Raider".to_string(),
    ]
}

fn default_recruit_rank() -> String {
    "Recruit".to_string()
}

fn default_social_rank() -> String {
    "Member".to_string()
}

fn default_inactive_rank() -> String {
    "Inactive".to_string()
}

fn default_sheet() -> String {
    "Ledger".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    300
}

fn default_full_refresh_every() -> u32 {
    12
}
