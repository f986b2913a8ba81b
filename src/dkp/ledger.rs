//! DKP ledger rows and the spreadsheet they come from.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::common::error::{LedgerError, LedgerResult};
use crate::common::normalize_name;
use crate::config::types::LedgerConfig;

const SHEETS_API: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// A ledger row exactly as the spreadsheet holds it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawLedgerRow {
    pub player: String,
    pub date: String,
    pub points: String,
    pub attendance: String,
}

/// A parsed ledger row.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerRow {
    pub player: String,
    pub date: NaiveDate,
    pub points: f64,
    pub attendance: f64,
}

impl LedgerRow {
    /// Parse a raw row. Bad dates become the Unix epoch and bad numbers become
    /// zero, so one broken row never fails a whole refresh.
    pub fn parse(raw: &RawLedgerRow) -> Self {
        let date = parse_date(&raw.date).unwrap_or_else(|| {
            warn!("Ledger row for '{}' has bad date '{}', using epoch", raw.player, raw.date);
            NaiveDate::default()
        });

        Self {
            player: normalize_name(&raw.player),
            date,
            points: parse_number(&raw.points, "points", &raw.player),
            attendance: parse_number(&raw.attendance, "attendance", &raw.player),
        }
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    ["%m/%d/%Y", "%Y-%m-%d", "%m/%d/%y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

fn parse_number(value: &str, field: &str, player: &str) -> f64 {
    let cleaned = value.trim().trim_end_matches('%').replace(',', "");
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            warn!("Ledger row for '{}' has bad {} '{}', using 0", player, field, value);
            0.0
        }
    }
}

/// Remote system of record for points and attendance.
#[async_trait]
pub trait LedgerSource: Send + Sync {
    /// Fetch every row after the first `since_row` data rows.
    async fn fetch_ledger_rows(&self, since_row: usize) -> LedgerResult<Vec<RawLedgerRow>>;
}

/// Ledger kept in a Google Sheet with columns `Player | Date | Points | Attendance`
/// and a header row.
pub struct SheetsLedger {
    client: reqwest::Client,
    spreadsheet_id: String,
    sheet: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

impl SheetsLedger {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            spreadsheet_id: config.spreadsheet_id.clone(),
            sheet: config.sheet.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// A1 range starting after `since_row` data rows (row 1 is the header).
    fn range(&self, since_row: usize) -> String {
        format!("{}!A{}:D", self.sheet, since_row + 2)
    }
}

#[async_trait]
impl LedgerSource for SheetsLedger {
    async fn fetch_ledger_rows(&self, since_row: usize) -> LedgerResult<Vec<RawLedgerRow>> {
        let url = format!(
            "{}/{}/values/{}",
            SHEETS_API,
            self.spreadsheet_id,
            self.range(since_row)
        );
        debug!("Fetching ledger rows from row {}", since_row);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LedgerError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: ValueRange = response.json().await.map_err(|e| LedgerError::Decode {
            message: e.to_string(),
        })?;

        Ok(rows_from_values(body.values))
    }
}

/// Convert sheet cells into raw rows; missing trailing cells are empty strings.
fn rows_from_values(values: Vec<Vec<String>>) -> Vec<RawLedgerRow> {
    values
        .into_iter()
        .map(|mut cells| {
            cells.resize(4, String::new());
            let mut cells = cells.into_iter();
            RawLedgerRow {
                player: cells.next().unwrap_or_default(),
                date: cells.next().unwrap_or_default(),
                points: cells.next().unwrap_or_default(),
                attendance: cells.next().unwrap_or_default(),
            }
        })
        .collect()
}
