//! Local storage for data that outlives a fetch.
//!
//! This module provides the `CacheManager` for storing and retrieving
//! data as JSON in the cache directory:
//! - The last fetched grades, shown while offline or before a refresh
//! - Per-subject manual grade ledgers (`GradeLedger`)

pub mod ledger;
pub mod manager;

pub use ledger::{GradeLedger, LedgerError, LEDGER_SLOTS};
pub use manager::{CacheManager, CachedData};
