//! The handler seam every log reaction plugs into.

use async_trait::async_trait;
use fancy_regex::{Captures, Regex};
use tracing::warn;

use crate::common::LogLine;

/// Something that reacts to log lines.
///
/// Each handler decides for itself whether a line is relevant and writes
/// any results to its own output channel.
#[async_trait]
pub trait LogHandler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Output channel key this handler writes to.
    fn output_channel(&self) -> &str;

    async fn handle(&self, line: &LogLine) -> anyhow::Result<()>;
}

/// Compile a built-in pattern.
pub(crate) fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("built-in handler pattern must compile")
}

/// Match `text`, treating regex engine errors as no match.
pub(crate) fn captures<'t>(regex: &Regex, text: &'t str) -> Option<Captures<'t>> {
    match regex.captures(text) {
        Ok(captures) => captures,
        Err(e) => {
            warn!("Pattern match error on '{}': {}", text, e);
            None
        }
    }
}

/// Text of capture group `index`, or an empty string.
pub(crate) fn group<'t>(captures: &Captures<'t>, index: usize) -> &'t str {
    captures.get(index).map(|m| m.as_str()).unwrap_or_default()
}
