use super::loan::LoanId;
use super::money::Amount;
use super::schedule::Installment;
use crate::error::{LoanError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RepaymentId(Uuid);

impl RepaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for RepaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RepaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum RepaymentStatus {
    Pending,
    Approved,
    Paid,
}

impl fmt::Display for RepaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RepaymentStatus::Pending => "pending",
            RepaymentStatus::Approved => "approved",
            RepaymentStatus::Paid => "paid",
        })
    }
}

/// A single installment owed against a loan.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Repayment {
    pub id: RepaymentId,
    pub loan_id: LoanId,
    /// 1-based position within the loan's schedule.
    pub sequence: u32,
    pub due_date: NaiveDate,
    /// Fixed at creation.
    pub amount: Amount,
    pub status: RepaymentStatus,
}

impl Repayment {
    pub fn scheduled(loan_id: LoanId, installment: &Installment) -> Self {
        Self {
            id: RepaymentId::new(),
            loan_id,
            sequence: installment.sequence,
            due_date: installment.due_date,
            amount: installment.amount,
            status: RepaymentStatus::Pending,
        }
    }

    pub fn is_paid(&self) -> bool {
        self.status == RepaymentStatus::Paid
    }

    /// Makes the installment payable. Part of the loan approval cascade.
    pub fn approve(&mut self) -> Result<()> {
        if self.status != RepaymentStatus::Pending {
            return Err(LoanError::InvalidState(format!(
                "Repayment {} is {}, expected pending",
                self.id, self.status
            )));
        }
        self.status = RepaymentStatus::Approved;
        Ok(())
    }

    /// Settles the installment with `tendered`.
    ///
    /// The installment must be approved, and `tendered` must cover the full
    /// amount owed. Any excess is not tracked.
    pub fn pay(&mut self, tendered: Decimal) -> Result<()> {
        if self.status != RepaymentStatus::Approved {
            return Err(LoanError::InvalidState(
                "The loan has not been approved yet".to_string(),
            ));
        }
        if tendered < self.amount.value() {
            return Err(LoanError::validation(
                "amount",
                format!("Tendered {} is less than the {} owed", tendered, self.amount),
            ));
        }
        self.status = RepaymentStatus::Paid;
        Ok(())
    }
}
