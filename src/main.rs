//! Raidkeeper - EverQuest raid log monitor
//!
//! Tails the game client's chat log, runs DKP auctions from chat commands
//! and member tells, and posts loot, zone, roll and other raid events to
//! Discord channels.

mod auction;
mod common;
mod config;
mod dispatch;
mod dkp;
mod eqlog;
mod handlers;
mod items;
mod output;
mod roster;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

use auction::{auto_close_task, AuctionHandler, AuctionRegistry, ManualResolution};
use config::{env::get_config_path, load_and_validate};
use dispatch::Dispatcher;
use dkp::{ledger_refresh_task, DkpCache, SheetsLedger};
use eqlog::LogTailer;
use handlers::{
    FlagHandler, LinkdeadHandler, LootHandler, ParseHandler, RaidDumpHandler, RollHandler,
    StandingHandler, ZoneHandler, ZoneTracker,
};
use items::StaticDatabase;
use output::{DiscordSink, OutputSink};
use roster::{roster_refresh_task, GuildDumpFile, RosterDirectory, TierRules};

/// Bounded so a stalled dispatcher applies back pressure to the tailer.
const LOG_CHANNEL_CAPACITY: usize = 1024;
const ROSTER_CHANNEL_CAPACITY: usize = 4;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Raidkeeper v{} starting...", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config_path = get_config_path();
    info!("Loading configuration from {}...", config_path);

    let config = load_and_validate(&config_path).map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!("Please ensure {} exists and is properly formatted.", config_path);
        e
    })?;

    info!("Configuration loaded successfully");
    info!("  Character: {}", config.character);
    info!("  Log: {}", config.log.path);
    info!("  Output channels: {}", config.discord.channels.len());
    info!("  Ledger: {}", if config.ledger.is_some() { "enabled" } else { "disabled" });
    info!("  Auto-close: {}", config.bids.auto_close);

    // Static data is required; there is nothing useful to do without it.
    let items = Arc::new(StaticDatabase::load(&config.items.path).map_err(|e| {
        error!("Failed to load item database: {}", e);
        e
    })?);

    // ============================================================
    // Shared state
    // ============================================================
    let sink: Arc<dyn OutputSink> = Arc::new(DiscordSink::new(
        &config.discord.token,
        &config.discord.channels,
    ));
    let roster = Arc::new(RosterDirectory::new(TierRules::from_config(&config.ranks)));
    let zone = Arc::new(ZoneTracker::new());

    let dkp = config
        .ledger
        .as_ref()
        .map(|ledger| Arc::new(DkpCache::new(Arc::new(SheetsLedger::new(ledger)))));

    let registry = Arc::new(AuctionRegistry::new(
        config.bids.clone(),
        roster.clone(),
        dkp.clone(),
        items.clone(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (line_tx, line_rx) = mpsc::channel(LOG_CHANNEL_CAPACITY);
    let (roster_tx, roster_rx) = mpsc::channel::<PathBuf>(ROSTER_CHANNEL_CAPACITY);
    // One pending reload is enough; further requests coalesce into it.
    let (reload_tx, reload_rx) = mpsc::channel::<()>(1);

    let dump_dir = config
        .roster
        .dump_dir
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| default_dump_dir(Path::new(&config.log.path)));
    debug!("Watching for roster dumps in {}", dump_dir.display());

    if let Some(ref initial) = config.roster.initial_dump {
        let path = dump_dir.join(initial);
        if let Err(e) = roster_tx.try_send(path) {
            warn!("Could not queue initial roster dump: {}", e);
        }
    }

    // ============================================================
    // Handlers, in dispatch order
    // ============================================================
    let auction_handler = Arc::new(AuctionHandler::new(
        registry.clone(),
        Arc::new(ManualResolution),
        sink.clone(),
    ));

    let mut dispatcher = Dispatcher::new();
    dispatcher.register(Arc::new(ZoneHandler::new(zone.clone(), sink.clone())));
    dispatcher.register(auction_handler.clone());
    dispatcher.register(Arc::new(LootHandler::new(&config.character, zone.clone(), sink.clone())));
    dispatcher.register(Arc::new(LinkdeadHandler::new(zone.clone(), sink.clone())));
    dispatcher.register(Arc::new(FlagHandler::new(&config.character, zone.clone(), sink.clone())));
    dispatcher.register(Arc::new(RollHandler::new(sink.clone())));
    dispatcher.register(Arc::new(ParseHandler::new(&config.character, sink.clone())));
    dispatcher.register(Arc::new(RaidDumpHandler::new(sink.clone(), dump_dir, roster_tx)));
    if let Some(ref cache) = dkp {
        dispatcher.register(Arc::new(StandingHandler::new(
            roster.clone(),
            cache.clone(),
            reload_tx,
            sink.clone(),
        )));
    }
    info!("Handlers: {}", dispatcher.handler_names().join(", "));

    // ============================================================
    // Background tasks
    // ============================================================
    let roster_task = tokio::spawn(roster_refresh_task(
        roster.clone(),
        Arc::new(GuildDumpFile),
        sink.clone(),
        roster_rx,
    ));

    let ledger_task = match (dkp, config.ledger.as_ref()) {
        (Some(cache), Some(ledger)) => Some(tokio::spawn(ledger_refresh_task(
            cache,
            sink.clone(),
            Duration::from_secs(ledger.refresh_interval_secs),
            ledger.full_refresh_every,
            reload_rx,
            shutdown_rx.clone(),
        ))),
        _ => None,
    };

    let auto_close = config.bids.auto_close.then(|| {
        tokio::spawn(auto_close_task(auction_handler.clone(), shutdown_rx.clone()))
    });

    let tailer = LogTailer::new(&config.log.path, Duration::from_millis(config.log.poll_interval_ms));
    let mut tail_task = tokio::spawn(tailer.run(line_tx, shutdown_rx.clone()));

    let dispatch_shutdown = shutdown_rx.clone();
    let mut dispatch_task = tokio::spawn(async move { dispatcher.run(line_rx, dispatch_shutdown).await });

    // ============================================================
    // Run until a signal or the pipeline stops
    // ============================================================
    let pipeline_finished = tokio::select! {
        biased;
        _ = shutdown_signal() => {
            info!("Shutdown signal received - stopping...");
            false
        }
        result = &mut tail_task => {
            match result {
                Ok(Ok(())) => warn!("Log tailer stopped"),
                Ok(Err(e)) => error!("Log tailer failed: {}", e),
                Err(e) => error!("Log tailer task panicked: {}", e),
            }
            true
        }
        result = &mut dispatch_task => {
            match result {
                Ok(lines) => warn!("Dispatcher stopped after {} lines", lines),
                Err(e) => error!("Dispatcher task panicked: {}", e),
            }
            true
        }
    };

    // Handle graceful shutdown
    if let Err(e) = shutdown_tx.send(true) {
        debug!("Shutdown channel closed: {}", e);
    }

    let timeout = Duration::from_secs(5);
    if !pipeline_finished {
        match tokio::time::timeout(timeout, dispatch_task).await {
            Ok(Ok(lines)) => info!("Dispatcher drained ({} lines total)", lines),
            Ok(Err(e)) => warn!("Dispatcher task panicked: {}", e),
            Err(_) => warn!("Dispatcher drain timed out"),
        }
    }
    for (name, task) in [("ledger refresh", ledger_task), ("auto-close", auto_close)] {
        if let Some(task) = task {
            if tokio::time::timeout(timeout, task).await.is_err() {
                warn!("{} task did not stop in time", name);
            }
        }
    }
    // The roster task ends once its request sender (owned by the dispatcher) is dropped.
    roster_task.abort();

    info!("Exiting...");
    Ok(())
}

/// The client writes `/outputfile` dumps to its install folder, one level
/// above the `Logs` folder holding the chat log.
fn default_dump_dir(log_path: &Path) -> PathBuf {
    log_path
        .parent()
        .and_then(|logs| logs.parent())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
