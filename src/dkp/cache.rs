//! Cached view of the DKP ledger.
//!
//! The cache holds every ledger row processed so far. Refreshes fetch only the
//! rows after the last processed one unless a full reload is requested, and the
//! network round trip happens without holding the cache lock.

use std::sync::Arc;
use std::time::Duration;

use backon::BackoffBuilder;
use chrono::{Local, NaiveDate};
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::common::error::LedgerResult;
use crate::dkp::ledger::{LedgerRow, LedgerSource};
use crate::output::OutputSink;

/// Attendance windows reported by [`DkpCache::standing`].
pub const ATTENDANCE_WINDOWS: [i64; 3] = [30, 60, 90];

#[derive(Default)]
struct LedgerState {
    rows: Vec<LedgerRow>,
    /// Data rows consumed from the source, including ones that failed to parse
    /// cleanly. Used as the offset for incremental fetches.
    processed: usize,
}

/// Points and attendance for one player.
#[derive(Debug, Clone, PartialEq)]
pub struct Standing {
    pub balance: f64,
    pub attendance_30: f64,
    pub attendance_60: f64,
    pub attendance_90: f64,
    pub attendance_lifetime: f64,
}

pub struct DkpCache {
    source: Arc<dyn LedgerSource>,
    state: RwLock<LedgerState>,
    /// Serializes refreshes so two incremental fetches never use the same offset.
    refreshing: Mutex<()>,
}

impl DkpCache {
    pub fn new(source: Arc<dyn LedgerSource>) -> Self {
        Self {
            source,
            state: RwLock::new(LedgerState::default()),
            refreshing: Mutex::new(()),
        }
    }

    /// Pull new ledger rows. With `full` set the cache is rebuilt from the
    /// first row. On error the previous state is kept. Returns the number of
    /// rows fetched.
    pub async fn refresh(&self, full: bool) -> LedgerResult<usize> {
        let _guard = self.refreshing.lock().await;

        let since_row = if full { 0 } else { self.state.read().await.processed };
        let raw_rows = self.source.fetch_ledger_rows(since_row).await?;
        let fetched = raw_rows.len();
        let parsed: Vec<LedgerRow> = raw_rows.iter().map(LedgerRow::parse).collect();

        let mut state = self.state.write().await;
        if full {
            state.rows = parsed;
            state.processed = fetched;
        } else {
            state.rows.extend(parsed);
            state.processed += fetched;
        }
        debug!(
            "Ledger refreshed: {} new rows, {} total (full: {})",
            fetched,
            state.rows.len(),
            full
        );
        Ok(fetched)
    }

    /// Sum of all point deltas for the player.
    pub async fn balance(&self, player: &str) -> f64 {
        let state = self.state.read().await;
        state
            .rows
            .iter()
            .filter(|row| row.player.eq_ignore_ascii_case(player.trim()))
            .map(|row| row.points)
            .sum()
    }

    /// Attendance over the `days` ending at `today`, rounded to two decimals.
    /// Rows dated on or after `today - days` count.
    pub async fn attendance(&self, player: &str, days: i64, today: NaiveDate) -> f64 {
        let cutoff = today - chrono::Duration::days(days);
        let state = self.state.read().await;
        let total: f64 = state
            .rows
            .iter()
            .filter(|row| row.player.eq_ignore_ascii_case(player.trim()))
            .filter(|row| row.date >= cutoff)
            .map(|row| row.attendance)
            .sum();
        round2(total)
    }

    /// Balance plus attendance over the standard windows and lifetime, as of today.
    pub async fn standing(&self, player: &str) -> Standing {
        self.standing_at(player, Local::now().date_naive()).await
    }

    pub async fn standing_at(&self, player: &str, today: NaiveDate) -> Standing {
        let lifetime = {
            let state = self.state.read().await;
            state
                .rows
                .iter()
                .filter(|row| row.player.eq_ignore_ascii_case(player.trim()))
                .map(|row| row.attendance)
                .sum::<f64>()
        };

        let [d30, d60, d90] = ATTENDANCE_WINDOWS;
        Standing {
            balance: self.balance(player).await,
            attendance_30: self.attendance(player, d30, today).await,
            attendance_60: self.attendance(player, d60, today).await,
            attendance_90: self.attendance(player, d90, today).await,
            attendance_lifetime: round2(lifetime),
        }
    }

    pub async fn row_count(&self) -> usize {
        self.state.read().await.rows.len()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 5s initial, 5min max, with jitter, unlimited retries.
fn ledger_backoff() -> impl Iterator<Item = Duration> {
    backon::ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(5))
        .with_max_delay(Duration::from_secs(300))
        .with_jitter()
        .without_max_times()
        .build()
}

/// Keep the cache current until shutdown.
///
/// Starts with a full load, then refreshes incrementally every `interval`.
/// Every `full_every` successful incremental refreshes (0 disables this), and
/// whenever a request arrives on `reload_rx`, the cache is rebuilt from the
/// first row so edited or deleted ledger rows are picked up.
/// Failed refreshes are retried with backoff and reported on the `status`
/// output channel once per failure streak.
pub async fn ledger_refresh_task(
    cache: Arc<DkpCache>,
    sink: Arc<dyn OutputSink>,
    interval: Duration,
    full_every: u32,
    mut reload_rx: mpsc::Receiver<()>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut backoff = ledger_backoff();
    let mut full = true;
    let mut requested = false;
    let mut since_full = 0u32;
    let mut failing = false;

    loop {
        let delay = match cache.refresh(full).await {
            Ok(fetched) => {
                if full || failing {
                    info!("Ledger loaded: {} rows", cache.row_count().await);
                }
                if failing {
                    sink.write("status", "Ledger refresh recovered").await;
                }
                if requested {
                    sink.write("status", &format!("Ledger reloaded: {} rows", cache.row_count().await))
                        .await;
                }
                if fetched > 0 {
                    debug!("Fetched {} ledger rows", fetched);
                }

                since_full = if full { 0 } else { since_full + 1 };
                full = full_every > 0 && since_full >= full_every;
                requested = false;
                failing = false;
                backoff = ledger_backoff();
                interval
            }
            Err(e) => {
                error!("Ledger refresh failed: {}", e);
                if !failing {
                    sink.write("status", &format!("Ledger refresh failed: {}", e)).await;
                }
                failing = true;
                let delay = backoff.next().unwrap_or(interval);
                warn!("Retrying ledger refresh in {:.1}s...", delay.as_secs_f64());
                delay
            }
        };

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            Some(()) = reload_rx.recv() => {
                info!("Full ledger reload requested");
                full = true;
                requested = true;
            }
            _ = shutdown_rx.changed() => {
                info!("Ledger refresh task shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::LedgerError;
    use crate::dkp::ledger::RawLedgerRow;
    use crate::output::MemorySink;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio_test::{assert_err, assert_ok};

    /// In-memory ledger that honors `since_row` and can be told to fail.
    #[derive(Default)]
    struct FakeLedger {
        rows: StdMutex<Vec<RawLedgerRow>>,
        fail: StdMutex<bool>,
        requests: StdMutex<Vec<usize>>,
    }

    impl FakeLedger {
        fn push(&self, player: &str, date: &str, points: &str, attendance: &str) {
            self.rows.lock().unwrap().push(RawLedgerRow {
                player: player.to_string(),
                date: date.to_string(),
                points: points.to_string(),
                attendance: attendance.to_string(),
            });
        }
    }

    #[async_trait]
    impl LedgerSource for FakeLedger {
        async fn fetch_ledger_rows(&self, since_row: usize) -> LedgerResult<Vec<RawLedgerRow>> {
            self.requests.lock().unwrap().push(since_row);
            if *self.fail.lock().unwrap() {
                return Err(LedgerError::Status {
                    status: 503,
                    message: "unavailable".to_string(),
                });
            }
            Ok(self.rows.lock().unwrap().iter().skip(since_row).cloned().collect())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn test_balance_sums_all_rows() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "01/01/2020", "100", "1");
        ledger.push("bobby", "10/18/2026", "-30", "1");
        ledger.push("Anna", "10/18/2026", "50", "1");
        let cache = DkpCache::new(ledger);

        cache.refresh(true).await.unwrap();

        assert_eq!(cache.balance("Bobby").await, 70.0);
        assert_eq!(cache.balance("ANNA").await, 50.0);
        assert_eq!(cache.balance("nobody").await, 0.0);
    }

    #[tokio::test]
    async fn test_incremental_refresh_fetches_only_new_rows() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/01/2026", "10", "0");
        let cache = DkpCache::new(ledger.clone());

        assert_eq!(assert_ok!(cache.refresh(true).await), 1);
        ledger.push("Bobby", "10/02/2026", "15", "0");
        assert_eq!(cache.refresh(false).await.unwrap(), 1);

        assert_eq!(*ledger.requests.lock().unwrap(), vec![0, 1]);
        assert_eq!(cache.balance("Bobby").await, 25.0);
        assert_eq!(cache.row_count().await, 2);
    }

    #[tokio::test]
    async fn test_full_refresh_rebuilds() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/01/2026", "10", "0");
        let cache = DkpCache::new(ledger.clone());
        cache.refresh(true).await.unwrap();

        ledger.rows.lock().unwrap()[0].points = "40".to_string();
        cache.refresh(true).await.unwrap();

        assert_eq!(cache.balance("Bobby").await, 40.0);
        assert_eq!(cache.row_count().await, 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_known_good() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/01/2026", "10", "0");
        let cache = DkpCache::new(ledger.clone());
        cache.refresh(true).await.unwrap();

        *ledger.fail.lock().unwrap() = true;
        assert_err!(cache.refresh(true).await);
        assert_eq!(cache.balance("Bobby").await, 10.0);
    }

    #[tokio::test]
    async fn test_bad_row_does_not_poison_batch() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "not a date", "abc", "1");
        ledger.push("Bobby", "10/18/2026", "25", "1");
        let cache = DkpCache::new(ledger);

        assert_eq!(cache.refresh(true).await.unwrap(), 2);
        assert_eq!(cache.balance("Bobby").await, 25.0);
        // The epoch-dated row only counts toward lifetime attendance.
        let standing = cache.standing_at("Bobby", today()).await;
        assert_eq!(standing.attendance_30, 1.0);
        assert_eq!(standing.attendance_lifetime, 2.0);
    }

    #[tokio::test]
    async fn test_attendance_windows_and_rounding() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/19/2026", "0", "0.333");
        ledger.push("Bobby", "09/19/2026", "0", "0.333");
        ledger.push("Bobby", "08/01/2026", "0", "1.5");
        ledger.push("Bobby", "01/01/2026", "0", "4");
        let cache = DkpCache::new(ledger);
        cache.refresh(true).await.unwrap();

        // 30 days back from Oct 19 is Sep 19, which is inside the window.
        assert_eq!(cache.attendance("Bobby", 30, today()).await, 0.67);
        assert_eq!(cache.attendance("Bobby", 90, today()).await, 2.17);

        let standing = cache.standing_at("bobby", today()).await;
        assert_eq!(standing.attendance_60, 0.67);
        assert_eq!(standing.attendance_lifetime, 6.17);
    }

    /// Poll until `check` holds, failing the test after about two seconds.
    async fn eventually(check: impl Fn() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_reload_request_picks_up_edited_rows() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/01/2026", "10", "0");
        ledger.push("Bobby", "10/02/2026", "5", "0");
        let cache = Arc::new(DkpCache::new(ledger.clone()));
        let sink = Arc::new(MemorySink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (reload_tx, reload_rx) = mpsc::channel(1);

        let task = tokio::spawn(ledger_refresh_task(
            cache.clone(),
            sink.clone(),
            Duration::from_secs(3600),
            0,
            reload_rx,
            shutdown_rx,
        ));
        eventually(|| !ledger.requests.lock().unwrap().is_empty()).await;

        // A past row is corrected and another removed from the sheet.
        {
            let mut rows = ledger.rows.lock().unwrap();
            rows[0].points = "40".to_string();
            rows.remove(1);
        }
        reload_tx.send(()).await.unwrap();
        eventually(|| !sink.lines("status").is_empty()).await;

        assert_eq!(sink.lines("status"), vec!["Ledger reloaded: 1 rows"]);
        assert_eq!(cache.balance("Bobby").await, 40.0);
        assert_eq!(cache.row_count().await, 1);
        assert_eq!(*ledger.requests.lock().unwrap(), vec![0, 0]);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_full_refresh() {
        let ledger = Arc::new(FakeLedger::default());
        ledger.push("Bobby", "10/01/2026", "10", "0");
        let cache = Arc::new(DkpCache::new(ledger.clone()));
        let sink = Arc::new(MemorySink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (_reload_tx, reload_rx) = mpsc::channel(1);

        let task = tokio::spawn(ledger_refresh_task(
            cache,
            sink.clone(),
            Duration::from_millis(5),
            2,
            reload_rx,
            shutdown_rx,
        ));
        eventually(|| ledger.requests.lock().unwrap().len() >= 5).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let requests = ledger.requests.lock().unwrap().clone();
        assert_eq!(requests[..5], [0, 1, 1, 0, 1]);
        // Periodic rebuilds are silent; only operator requests are acknowledged.
        assert!(sink.written().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_task_reports_failure_and_stops() {
        let ledger = Arc::new(FakeLedger::default());
        *ledger.fail.lock().unwrap() = true;
        let cache = Arc::new(DkpCache::new(ledger));
        let sink = Arc::new(MemorySink::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (_reload_tx, reload_rx) = mpsc::channel(1);

        let task = tokio::spawn(ledger_refresh_task(
            cache,
            sink.clone(),
            Duration::from_secs(60),
            0,
            reload_rx,
            shutdown_rx,
        ));
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let lines = sink.lines("status");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("Ledger refresh failed"));
    }
}
