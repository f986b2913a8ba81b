//! Log line classification.
//!
//! Turns raw client log lines (`[Mon Oct 19 21:04:11 2026] Bob tells you, 'hi'`)
//! into [`LogLine`]s tagged with their chat channel and speaker.

use chrono::NaiveDateTime;
use fancy_regex::Regex;
use tracing::{debug, warn};

use crate::common::{Channel, LogLine};

const TIMESTAMP_PATTERN: &str = r"^\[\w{3} (\w{3} +\d{1,2} \d{2}:\d{2}:\d{2} \d{4})\] (.*)$";
const TIMESTAMP_FORMAT: &str = "%b %d %H:%M:%S %Y";

/// Lines written by the log owner. Only the message is captured.
const SELF_PATTERNS: &[(&str, Channel)] = &[
    (r"^You told (\w+), '(.*)'$", Channel::Tell),
    (r"^You tell your raid, '(.*)'$", Channel::Raid),
    (r"^You say to your guild, '(.*)'$", Channel::Guild),
    (r"^You tell your party, '(.*)'$", Channel::Group),
    (r"^You say out of character, '(.*)'$", Channel::Ooc),
    (r"^You shout, '(.*)'$", Channel::Shout),
    (r"^You auction, '(.*)'$", Channel::Auction),
    (r"^You say, '(.*)'$", Channel::Say),
];

/// Lines spoken by someone else. Captures speaker then message.
const OTHER_PATTERNS: &[(&str, Channel)] = &[
    (r"^(\w+) tells you, '(.*)'$", Channel::Tell),
    (r"^(\w+) tells the guild, '(.*)'$", Channel::Guild),
    (r"^(\w+) tells the raid,\s+'(.*)'$", Channel::Raid),
    (r"^(\w+) tells the group, '(.*)'$", Channel::Group),
    (r"^(\w+) says out of character, '(.*)'$", Channel::Ooc),
    (r"^(\w+) shouts, '(.*)'$", Channel::Shout),
    (r"^(\w+) auctions, '(.*)'$", Channel::Auction),
    (r"^(\w+) says, '(.*)'$", Channel::Say),
];

#[derive(Debug, Clone)]
struct ChatPattern {
    regex: Regex,
    channel: Channel,
    from_self: bool,
}

/// Classifies raw log lines by channel and speaker.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    timestamp_re: Regex,
    patterns: Vec<ChatPattern>,
}

impl LineClassifier {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("built-in log pattern must compile");

        let patterns = SELF_PATTERNS
            .iter()
            .map(|(p, c)| (p, c, true))
            .chain(OTHER_PATTERNS.iter().map(|(p, c)| (p, c, false)))
            .map(|(pattern, channel, from_self)| ChatPattern {
                regex: compile(*pattern),
                channel: *channel,
                from_self,
            })
            .collect();

        Self {
            timestamp_re: compile(TIMESTAMP_PATTERN),
            patterns,
        }
    }

    /// Classify one raw line. Returns `None` for lines without a valid timestamp.
    pub fn classify(&self, raw_line: &str) -> Option<LogLine> {
        let captures = match self.timestamp_re.captures(raw_line.trim_end()) {
            Ok(Some(c)) => c,
            Ok(None) => {
                debug!("Skipping line without timestamp: {}", raw_line);
                return None;
            }
            Err(e) => {
                warn!("Timestamp match error: {}", e);
                return None;
            }
        };

        let stamp = captures.get(1)?.as_str();
        let body = captures.get(2)?.as_str();
        let timestamp = match NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT) {
            Ok(ts) => ts,
            Err(e) => {
                debug!("Skipping line with bad timestamp '{}': {}", stamp, e);
                return None;
            }
        };

        Some(self.classify_body(timestamp, body))
    }

    /// Classify a line body whose timestamp has already been stripped.
    pub fn classify_body(&self, timestamp: NaiveDateTime, body: &str) -> LogLine {
        for pattern in &self.patterns {
            let captures = match pattern.regex.captures(body) {
                Ok(Some(c)) => c,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Chat pattern match error on '{}': {}", body, e);
                    continue;
                }
            };

            // "You told X, '...'" is the one self pattern that also names someone.
            let message_group = captures.len() - 1;
            let sender = if pattern.from_self {
                None
            } else {
                captures.get(1).map(|m| m.as_str().to_string())
            };
            let text = captures
                .get(message_group)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default();

            return LogLine {
                timestamp,
                channel: pattern.channel,
                sender,
                from_self: pattern.from_self,
                text,
                raw: body.to_string(),
            };
        }

        LogLine::system(timestamp, body)
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new()
    }
}
