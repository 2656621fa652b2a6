use crate::domain::access::{Actor, Role, UserId};
use crate::error::{LoanError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    Submit,
    Approve,
    Reject,
    Cancel,
    View,
    Pay,
}

/// One row of a command script.
///
/// `loan` is the 1-based position of a loan submitted earlier in the same
/// script and `installment` the 1-based position within that loan's schedule.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct Command {
    pub r#type: CommandType,
    pub actor: u64,
    pub role: Role,
    pub loan: Option<usize>,
    pub installment: Option<u32>,
    /// Parsed from the field text, keeping every digit.
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub amount: Option<Decimal>,
    pub term: Option<u32>,
}

impl Command {
    pub fn actor(&self) -> Actor {
        Actor::new(UserId(self.actor), self.role)
    }

    pub fn require_loan(&self) -> Result<usize> {
        self.loan
            .ok_or_else(|| LoanError::validation("loan", "Missing loan reference"))
    }

    pub fn require_installment(&self) -> Result<u32> {
        self.installment
            .ok_or_else(|| LoanError::validation("installment", "Missing installment number"))
    }

    pub fn require_amount(&self) -> Result<Decimal> {
        self.amount
            .ok_or_else(|| LoanError::validation("amount", "Missing amount"))
    }

    pub fn require_term(&self) -> Result<u32> {
        self.term
            .ok_or_else(|| LoanError::validation("term", "Missing term"))
    }
}

/// Reads commands from a CSV source.
///
/// This reader wraps `csv::Reader` and provides an iterator over `Result<Command>`.
/// It handles whitespace trimming and flexible record lengths automatically.
pub struct CommandReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CommandReader<R> {
    /// Creates a new `CommandReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and deserializes commands.
    pub fn commands(self) -> impl Iterator<Item = Result<Command>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LoanError::from))
    }
}
