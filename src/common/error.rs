//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Errors raised while talking to the DKP ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Ledger request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Ledger returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Ledger response could not be decoded: {message}")]
    Decode { message: String },
}

/// Errors raised while loading a roster snapshot.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("Failed to read roster dump '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Roster dump '{path}' contained no members")]
    Empty { path: String },
}

/// Errors raised while loading the static item/spell database.
#[derive(Debug, Error)]
pub enum ItemDbError {
    #[error("Failed to read item database '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse item database '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Validation errors from the auction registry.
///
/// These are returned to the caller and turned into a short notice on the
/// auction output channel; they never stop log ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuctionError {
    #[error("Unknown item: {name}")]
    UnknownItem { name: String },

    #[error("Quantity must be at least 1 (got {quantity})")]
    InvalidQuantity { quantity: i64 },

    #[error("Duration must be between 1 and 1440 minutes (got {minutes})")]
    InvalidDuration { minutes: i64 },

    #[error("Bids already open on {item}(x{quantity})")]
    AlreadyOpen { item: String, quantity: u32 },

    #[error("Bids on {item} already closed.")]
    NotOpen { item: String },
}

/// Result type alias for ledger operations.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Result type alias for auction registry operations.
pub type AuctionResult<T> = std::result::Result<T, AuctionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auction_error_messages_match_chat_notices() {
        let err = AuctionError::NotOpen {
            item: "Cloth Cap".to_string(),
        };
        assert_eq!(err.to_string(), "Bids on Cloth Cap already closed.");

        let err = AuctionError::AlreadyOpen {
            item: "Cloth Cap".to_string(),
            quantity: 2,
        };
        assert_eq!(err.to_string(), "Bids already open on Cloth Cap(x2)");
    }
}
