//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `RAIDKEEPER_DISCORD_TOKEN` - Discord bot token
//! - `RAIDKEEPER_LEDGER_API_KEY` - Google Sheets API key for the DKP ledger
//! - `RAIDKEEPER_LOG_PATH` - Game log file to watch
//! - `RAIDKEEPER_CHARACTER` - Character owning the log

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "RAIDKEEPER";

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like tokens and API keys to be
/// provided via environment variables instead of the config file.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(token) = env::var(format!("{}_DISCORD_TOKEN", ENV_PREFIX)) {
        config.discord.token = token;
    }

    if let Ok(api_key) = env::var(format!("{}_LEDGER_API_KEY", ENV_PREFIX)) {
        if let Some(ref mut ledger) = config.ledger {
            ledger.api_key = api_key;
        }
    }

    if let Ok(path) = env::var(format!("{}_LOG_PATH", ENV_PREFIX)) {
        config.log.path = path;
    }
    if let Ok(character) = env::var(format!("{}_CHARACTER", ENV_PREFIX)) {
        config.character = character;
    }

    config
}

/// Get the config file path from environment or use default.
///
/// Checks `RAIDKEEPER_CONFIG` environment variable, otherwise returns "raidkeeper.conf".
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| "raidkeeper.conf".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_test_config() -> Config {
        Config {
            character: "Bidmaster".to_string(),
            log: LogConfig {
                path: "eqlog_Bidmaster_test.txt".to_string(),
                poll_interval_ms: 250,
            },
            discord: DiscordConfig {
                token: "original_token".to_string(),
                channels: Default::default(),
            },
            bids: BidConfig::default(),
            ranks: RankConfig::default(),
            ledger: None,
            items: ItemsConfig {
                path: "items.json".to_string(),
            },
            roster: RosterConfig::default(),
        }
    }

    #[test]
    fn test_env_prefix() {
        assert_eq!(ENV_PREFIX, "RAIDKEEPER");
    }

    #[test]
    fn test_apply_env_overrides_no_vars() {
        env::remove_var("RAIDKEEPER_DISCORD_TOKEN");
        env::remove_var("RAIDKEEPER_LOG_PATH");
        env::remove_var("RAIDKEEPER_CHARACTER");

        let config = make_test_config();
        let result = apply_env_overrides(config);

        assert_eq!(result.discord.token, "original_token");
        assert_eq!(result.log.path, "eqlog_Bidmaster_test.txt");
        assert_eq!(result.character, "Bidmaster");
    }
}
