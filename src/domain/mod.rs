//! Domain layer: loans, their installments, and the rules that move them
//! through their lifecycle. Nothing here performs I/O; storage, time and
//! authorization are reached through the traits in [`ports`].

pub mod access;
pub mod loan;
pub mod money;
pub mod ports;
pub mod reconciliation;
pub mod repayment;
pub mod schedule;
