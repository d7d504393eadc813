//! Integration tests for the ledger, backup and analysis pipeline.

mod insight_scenarios;
mod mock_store;
mod restore_flow;
