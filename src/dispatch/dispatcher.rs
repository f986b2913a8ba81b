//! Fan-out of log lines to handlers.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::common::LogLine;
use crate::dispatch::handler::LogHandler;

/// Runs every registered handler, in order, for each line.
///
/// All handlers finish with line N before line N+1 is looked at, so state
/// such as the current zone is always current when a later line needs it.
#[derive(Default)]
pub struct Dispatcher {
    handlers: Vec<Arc<dyn LogHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: Arc<dyn LogHandler>) {
        debug!("Registered handler {} -> {}", handler.name(), handler.output_channel());
        self.handlers.push(handler);
    }

    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Present one line to every handler. A handler that fails or panics is
    /// logged and skipped; the rest still run. Returns the number of failures.
    pub async fn dispatch(&self, line: &LogLine) -> usize {
        let mut failures = 0;

        for handler in &self.handlers {
            match AssertUnwindSafe(handler.handle(line)).catch_unwind().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("Handler {} failed on '{}': {:#}", handler.name(), line.raw, e);
                }
                Err(panic) => {
                    failures += 1;
                    error!(
                        "Handler {} panicked on '{}': {}",
                        handler.name(),
                        line.raw,
                        panic_message(panic.as_ref())
                    );
                }
            }
        }

        failures
    }

    /// Consume the line stream until it ends or shutdown is signalled.
    ///
    /// Shutdown is only checked between lines; a line that has started
    /// dispatching always runs to completion. Returns the number of lines
    /// dispatched.
    pub async fn run(&self, mut lines: mpsc::Receiver<LogLine>, mut shutdown_rx: watch::Receiver<bool>) -> u64 {
        let mut dispatched = 0u64;

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                line = lines.recv() => {
                    let Some(line) = line else {
                        info!("Log stream ended");
                        break;
                    };
                    self.dispatch(&line).await;
                    dispatched += 1;
                }
            }
        }

        info!("Dispatcher stopped after {} lines", dispatched);
        dispatched
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
