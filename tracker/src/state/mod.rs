//! # Caller-side State
//!
//! What a view layer holds on top of the dispatch client:
//!
//! - **ledger**: fetched collections plus derived selectors
//! - **filter_sync**: the debounced, session-persisted filter
//! - **report_loader**: summary loads that ignore responses nobody waits for

pub mod filter_sync;
pub mod ledger;
pub mod report_loader;

pub use filter_sync::{FilterChange, FilterSync, DEFAULT_DEBOUNCE, FILTER_QUERY_KEY};
pub use ledger::LedgerState;
pub use report_loader::{InFlight, LoadOutcome, ReportLoader};
