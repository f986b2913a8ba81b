//! Shared types used across the application.

use chrono::NaiveDateTime;

/// Chat channel a log line was said in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Tell,
    Say,
    Guild,
    Raid,
    Group,
    Ooc,
    Shout,
    Auction,
    System,
}

impl Channel {
    /// Whether players talk in this channel (everything but system text).
    pub fn is_chat(&self) -> bool {
        !matches!(self, Self::System)
    }
}

/// A single classified line from the game log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    /// Timestamp printed by the client at the start of the line.
    pub timestamp: NaiveDateTime,
    pub channel: Channel,
    /// Speaker for chat lines. `None` for system text and lines written by the log owner.
    pub sender: Option<String>,
    /// True when the log owner wrote the line ("You tell your raid, ...").
    pub from_self: bool,
    /// Message body with the chat framing removed.
    pub text: String,
    /// Body of the line as it appeared after the timestamp.
    pub raw: String,
}

impl LogLine {
    /// Build a system line (used by tests and synthetic events).
    pub fn system(timestamp: NaiveDateTime, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            timestamp,
            channel: Channel::System,
            sender: None,
            from_self: false,
            raw: text.clone(),
            text,
        }
    }
}

/// Normalize a character name: trimmed, first letter upper case, rest lower case.
pub fn normalize_name(name: &str) -> String {
    let trimmed = name.trim();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  bOBBY "), "Bobby");
        assert_eq!(normalize_name("Ann"), "Ann");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_only_system_lines_are_not_chat() {
        for channel in [Channel::Tell, Channel::Guild, Channel::Raid, Channel::Auction] {
            assert!(channel.is_chat());
        }
        assert!(!Channel::System.is_chat());
    }
}
