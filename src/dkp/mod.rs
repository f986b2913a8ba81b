//! DKP ledger access and the cached balances derived from it.

pub mod cache;
pub mod ledger;

pub use cache::{ledger_refresh_task, DkpCache, Standing};
pub use ledger::{LedgerRow, LedgerSource, RawLedgerRow, SheetsLedger};
