//! Database access for lrcforge

pub mod ledger;

pub use ledger::{LedgerEntry, ProcessingLedger, RecordOutcome};
