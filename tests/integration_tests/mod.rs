//! Integration tests module
//!
//! End-to-end runs of the miner against a wiremock `/foodstats` endpoint,
//! covering complete runs, fail-soft workers and cancellation.

pub mod cancellation_test;
pub mod engine_test;
pub mod error_scenarios;
