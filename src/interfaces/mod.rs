//! Outer adapters: the CSV command script format and the loan report.

pub mod csv;
pub mod script;
