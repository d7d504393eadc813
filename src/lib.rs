//! UmaLog: horse-race betting ledger.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod amount;
pub mod analysis;
pub mod backup;
pub mod config;
pub mod dashboard;
pub mod entry;
pub mod storage;
pub mod types;
