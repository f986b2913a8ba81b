//! Configuration validation.
//!
//! Validates configuration values and provides helpful error messages.

use crate::auction::registry::MAX_DURATION_MINUTES;
use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Output channel keys the handlers write to.
pub const KNOWN_OUTPUT_CHANNELS: &[&str] = &[
    "auction", "zone", "loot", "linkdead", "flags", "rolls", "parses", "raid", "status",
];

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.character.trim().is_empty() {
        errors.push("character is required".to_string());
    }
    if config.log.path.is_empty() {
        errors.push("log.path is required".to_string());
    }
    if config.log.poll_interval_ms == 0 {
        errors.push("log.poll_interval_ms must be non-zero".to_string());
    }

    if config.discord.token.is_empty() {
        errors.push("discord.token is required".to_string());
    }
    if config.discord.token == "YOUR_DISCORD_TOKEN_HERE" {
        errors.push("discord.token has not been configured (still using placeholder)".to_string());
    }
    for (key, id) in &config.discord.channels {
        if *id == 0 {
            errors.push(format!("discord.channels.{} must be non-zero", key));
        }
        if !KNOWN_OUTPUT_CHANNELS.contains(&key.as_str()) {
            errors.push(format!(
                "discord.channels.{} is not a known output channel (use: {})",
                key,
                KNOWN_OUTPUT_CHANNELS.join(", ")
            ));
        }
    }

    if config.bids.min_bid < 0 {
        errors.push(format!("bids.min_bid must not be negative (got {})", config.bids.min_bid));
    }
    if config.bids.increment < 1 {
        errors.push(format!("bids.increment must be at least 1 (got {})", config.bids.increment));
    }
    if config.bids.second_main_cap < 0 {
        errors.push("bids.second_main_cap must not be negative (0 = unlimited)".to_string());
    }
    if !(1..=MAX_DURATION_MINUTES).contains(&config.bids.default_duration_minutes) {
        errors.push(format!(
            "bids.default_duration_minutes must be between 1 and {} (got {})",
            MAX_DURATION_MINUTES, config.bids.default_duration_minutes
        ));
    }

    if config.ranks.main.is_empty() {
        errors.push("ranks.main must list at least one rank".to_string());
    }

    if let Some(ref ledger) = config.ledger {
        if ledger.spreadsheet_id.is_empty() {
            errors.push("ledger.spreadsheet_id is required".to_string());
        }
        if ledger.api_key.is_empty() {
            errors.push("ledger.api_key is required".to_string());
        }
        if ledger.refresh_interval_secs == 0 {
            errors.push("ledger.refresh_interval_secs must be non-zero".to_string());
        }
    }

    if config.items.path.is_empty() {
        errors.push("items.path is required".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::*;

    fn make_valid_config() -> Config {
        Config {
            character: "Bidmaster".to_string(),
            log: LogConfig {
                path: "eqlog_Bidmaster_test.txt".to_string(),
                poll_interval_ms: 250,
            },
            discord: DiscordConfig {
                token: "valid_token_here".to_string(),
                channels: [("auction".to_string(), 987654321)].into_iter().collect(),
            },
            bids: BidConfig::default(),
            ranks: RankConfig::default(),
            ledger: Some(LedgerConfig {
                spreadsheet_id: "sheet".to_string(),
                sheet: "Ledger".to_string(),
                api_key: "key".to_string(),
                refresh_interval_secs: 300,
                full_refresh_every: 12,
            }),
            items: ItemsConfig {
                path: "items.json".to_string(),
            },
            roster: RosterConfig::default(),
        }
    }

    #[test]
    fn test_valid_config_passes() {
        let config = make_valid_config();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_placeholder_token_fails() {
        let mut config = make_valid_config();
        config.discord.token = "YOUR_DISCORD_TOKEN_HERE".to_string();

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("placeholder"));
    }

    #[test]
    fn test_unknown_output_channel_fails() {
        let mut config = make_valid_config();
        config.discord.channels.insert("bogus".to_string(), 42);

        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("not a known output channel"));
    }

    #[test]
    fn test_zero_increment_fails() {
        let mut config = make_valid_config();
        config.bids.increment = 0;

        let result = validate_config(&config);
        assert!(result.unwrap_err().to_string().contains("bids.increment"));
    }

    #[test]
    fn test_default_duration_out_of_range_fails() {
        let mut config = make_valid_config();
        config.bids.default_duration_minutes = 5000;

        let result = validate_config(&config);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("bids.default_duration_minutes must be between 1 and 1440"));
    }

    #[test]
    fn test_errors_are_collected() {
        let mut config = make_valid_config();
        config.character = String::new();
        config.items.path = String::new();

        let message = validate_config(&config).unwrap_err().to_string();
        assert!(message.contains("character is required"));
        assert!(message.contains("items.path is required"));
    }
}
