//! Guild roster dumps written by the client's `/outputfile guild` command.
//!
//! A dump is tab separated, one member per line:
//! `Name  Level  Class  Rank  Alt  LastOn  Zone  PublicNote  ...`
//! where the alt column holds `A` for alts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::common::error::RosterError;
use crate::output::OutputSink;
use crate::roster::directory::{RosterDirectory, RosterEntry};

const COL_NAME: usize = 0;
const COL_RANK: usize = 3;
const COL_ALT: usize = 4;
const COL_PUBLIC_NOTE: usize = 7;

/// Source of roster snapshots.
#[async_trait]
pub trait RosterSource: Send + Sync {
    async fn fetch_roster_snapshot(&self, path: &Path) -> Result<Vec<RosterEntry>, RosterError>;
}

/// Reads guild dump files from disk.
#[derive(Debug, Clone, Default)]
pub struct GuildDumpFile;

#[async_trait]
impl RosterSource for GuildDumpFile {
    async fn fetch_roster_snapshot(&self, path: &Path) -> Result<Vec<RosterEntry>, RosterError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| RosterError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let entries = parse_guild_dump(&content);
        if entries.is_empty() {
            return Err(RosterError::Empty {
                path: path.display().to_string(),
            });
        }
        Ok(entries)
    }
}

/// Parse the body of a guild dump. Rows too short to hold a rank are skipped.
pub fn parse_guild_dump(content: &str) -> Vec<RosterEntry> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(index, line)| {
            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() <= COL_ALT {
                warn!("Skipping short guild dump row {}: {:?}", index + 1, line);
                return None;
            }
            Some(RosterEntry {
                name: columns[COL_NAME].trim().to_string(),
                rank: columns[COL_RANK].trim().to_string(),
                is_alt: columns[COL_ALT].trim().eq_ignore_ascii_case("A"),
                public_note: columns
                    .get(COL_PUBLIC_NOTE)
                    .map(|note| note.trim().to_string())
                    .unwrap_or_default(),
            })
        })
        .collect()
}

/// Load a roster dump and merge it into the directory.
pub async fn load_roster(
    directory: &RosterDirectory,
    source: &dyn RosterSource,
    path: &Path,
) -> Result<usize, RosterError> {
    let snapshot = source.fetch_roster_snapshot(path).await?;
    let count = snapshot.len();
    directory.ingest_roster(snapshot).await;
    Ok(count)
}

/// Background task that reloads the roster whenever a dump is detected.
///
/// Reading and parsing happen here, off the log ingestion path; the directory
/// write lock is only held while the parsed snapshot is merged.
pub async fn roster_refresh_task(
    directory: Arc<RosterDirectory>,
    source: Arc<dyn RosterSource>,
    sink: Arc<dyn OutputSink>,
    mut requests: mpsc::Receiver<PathBuf>,
) {
    while let Some(path) = requests.recv().await {
        info!("Loading roster dump {}", path.display());
        match load_roster(&directory, source.as_ref(), &path).await {
            Ok(count) => {
                sink.write("status", &format!("Roster updated from {} ({} members)", file_name(&path), count))
                    .await;
            }
            Err(e) => {
                error!("Roster refresh failed: {}", e);
                sink.write("status", &format!("Roster refresh failed: {}", e)).await;
            }
        }
    }
    info!("Roster refresh task ended");
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
