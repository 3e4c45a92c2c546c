//! # Storage Module
//!
//! Handles the persistence medium for the expense tracker.
//!
//! The repository only ever sees the [`KeyValueStore`] trait, so the medium can
//! be a directory of JSON files, process memory, or nothing at all (storage
//! disabled) without affecting the domain logic.
//!
//! ## Implementations
//!
//! - **FileStore**: one JSON document per key, written through a temp file and
//!   renamed into place
//! - **MemoryStore**: process-lifetime map, used as the session store
//! - **DisabledStore**: fails every call, models an unavailable medium

pub mod traits;
pub mod file_store;
pub mod memory_store;

#[cfg(test)]
pub mod test_utils;

pub use traits::KeyValueStore;
pub use file_store::FileStore;
pub use memory_store::{DisabledStore, MemoryStore};
