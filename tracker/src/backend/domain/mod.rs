//! # Domain Module
//!
//! Business rules for categories, expenses and the reports derived from them.
//! Nothing here knows about HTTP or about which backend a caller talks to.
//!
//! ## Module Organization
//!
//! - **models**: normalization and validation of categories and expenses
//! - **dates**: calendar-day parsing and formatting
//! - **reports**: the aggregation engine (monthly/category totals, filtered views)
//! - **local_repository**: the canonical store of record on top of a key-value medium
//! - **errors**: the repository error taxonomy
//!
//! ## Business Rules
//!
//! - Amounts are finite and never negative
//! - Titles and category names are non-empty after trimming
//! - Every stored date is a `YYYY-MM-DD` day
//! - Every expense references an existing category; deleting a category moves
//!   its expenses to `misc`, which can never be deleted

pub mod dates;
pub mod errors;
pub mod local_repository;
pub mod models;
pub mod reports;

pub use errors::{RepoError, RepoResult};
pub use local_repository::{LocalRepository, SeedMetadata};
