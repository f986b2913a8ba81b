//! Log file tailing.
//!
//! Polls the client log on a fixed interval and forwards every new complete
//! line, classified, to the dispatcher. Starts at the end of the file so old
//! history is not replayed.

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::{mpsc, watch};
use tokio_util::codec::{Decoder, LinesCodec};
use tracing::{debug, info, warn};

use crate::common::LogLine;
use crate::eqlog::classifier::LineClassifier;

/// Longest line we are willing to buffer.
const MAX_LINE_LENGTH: usize = 64 * 1024;

/// Tails a game log file.
pub struct LogTailer {
    path: PathBuf,
    poll_interval: Duration,
    classifier: LineClassifier,
}

/// Open file plus the decoder state for the partial line at its end.
struct TailState {
    file: File,
    position: u64,
    buffer: BytesMut,
    codec: LinesCodec,
}

impl LogTailer {
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            classifier: LineClassifier::new(),
        }
    }

    /// Run until the shutdown signal is raised or the receiver goes away.
    pub async fn run(
        self,
        tx: mpsc::Sender<LogLine>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> Result<()> {
        info!("Tailing game log {}", self.path.display());
        let mut state: Option<TailState> = None;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            if state.is_none() {
                state = self.open_at_end().await;
            }

            if let Some(ref mut tail) = state {
                match self.read_new_lines(tail).await {
                    Ok(lines) => {
                        for line in lines {
                            if tx.send(line).await.is_err() {
                                info!("Log line receiver closed, stopping tailer");
                                return Ok(());
                            }
                        }
                    }
                    Err(e) => {
                        warn!("Failed to read {}: {}", self.path.display(), e);
                        state = None;
                    }
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        info!("Log tailer stopped");
        Ok(())
    }

    async fn open_at_end(&self) -> Option<TailState> {
        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) => {
                debug!("Log file {} not available yet: {}", self.path.display(), e);
                return None;
            }
        };

        let position = match file.seek(SeekFrom::End(0)).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to seek {}: {}", self.path.display(), e);
                return None;
            }
        };

        debug!("Opened {} at offset {}", self.path.display(), position);
        Some(TailState {
            file,
            position,
            buffer: BytesMut::with_capacity(8 * 1024),
            codec: LinesCodec::new_with_max_length(MAX_LINE_LENGTH),
        })
    }

    /// Read everything appended since the last poll and decode complete lines.
    async fn read_new_lines(&self, tail: &mut TailState) -> Result<Vec<LogLine>> {
        let len = tail.file.metadata().await?.len();
        if len < tail.position {
            info!("Log file {} was truncated, restarting from the top", self.path.display());
            tail.file.seek(SeekFrom::Start(0)).await?;
            tail.position = 0;
            tail.buffer.clear();
            tail.codec = LinesCodec::new_with_max_length(MAX_LINE_LENGTH);
        }

        loop {
            let read = tail.file.read_buf(&mut tail.buffer).await?;
            if read == 0 {
                break;
            }
            tail.position += read as u64;
        }

        Ok(decode_lines(&self.classifier, &mut tail.codec, &mut tail.buffer))
    }
}

/// Pull every complete line out of `buffer`, leaving a trailing partial line in place.
fn decode_lines(
    classifier: &LineClassifier,
    codec: &mut LinesCodec,
    buffer: &mut BytesMut,
) -> Vec<LogLine> {
    let mut lines = Vec::new();
    loop {
        match codec.decode(buffer) {
            Ok(Some(raw)) => {
                if let Some(line) = classifier.classify(&raw) {
                    lines.push(line);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Dropping unreadable log line: {}", e);
            }
        }
    }
    lines
}
