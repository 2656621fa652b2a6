//! Application layer containing the loan lifecycle orchestration.
//!
//! This module defines the `LoanEngine`, the entry point for submitting,
//! approving, viewing and paying off loans. It wires the domain rules to the
//! storage, authorization and clock ports.

pub mod engine;
