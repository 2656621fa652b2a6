use crate::error::{LoanError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of decimal places kept for installment amounts.
pub const CENT_SCALE: u32 = 2;

/// Represents a strictly positive monetary amount.
///
/// This is a wrapper around `rust_decimal::Decimal` so that loan principals and
/// installment amounts can never be zero or negative once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LoanError::validation("amount", "Amount must be positive"))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Splits the amount into `parts` equal shares rounded half-up to cents.
    ///
    /// No drift correction is applied: `parts` shares may sum to slightly more
    /// or less than the original amount.
    pub fn split(&self, parts: u32) -> Result<Self> {
        if parts == 0 {
            return Err(LoanError::validation("term", "Term must be positive"));
        }
        let share = (self.0 / Decimal::from(parts))
            .round_dp_with_strategy(CENT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        Self::new(share).map_err(|_| {
            LoanError::validation(
                "amount",
                format!("Amount {} is too small to split into {} installments", self.0, parts),
            )
        })
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LoanError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
