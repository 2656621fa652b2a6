use super::access::UserId;
use super::money::Amount;
use super::repayment::Repayment;
use crate::error::{LoanError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LoanId(Uuid);

impl LoanId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for LoanId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
    Cancelled,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Paid => "paid",
            LoanStatus::Rejected => "rejected",
            LoanStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Paid | LoanStatus::Rejected | LoanStatus::Cancelled
        )
    }

    /// The loan state machine. Terminal states have no outgoing edges.
    pub fn can_transition_to(&self, next: LoanStatus) -> bool {
        matches!(
            (self, next),
            (LoanStatus::Pending, LoanStatus::Approved)
                | (LoanStatus::Pending, LoanStatus::Rejected)
                | (LoanStatus::Pending, LoanStatus::Cancelled)
                | (LoanStatus::Pending, LoanStatus::Paid)
                | (LoanStatus::Approved, LoanStatus::Paid)
        )
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A borrowing request and its lifecycle status.
///
/// The installments owned by a loan live in the ledger store, keyed by the
/// loan's id, and are not embedded here.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Loan {
    pub id: LoanId,
    /// The principal who submitted the loan.
    pub owner: UserId,
    /// Requested principal.
    pub amount: Amount,
    /// Number of installments.
    pub term: u32,
    pub status: LoanStatus,
    pub submitted_at: DateTime<Utc>,
    /// Set only when the loan is approved.
    pub approved_on: Option<NaiveDate>,
}

impl Loan {
    /// Creates a new loan in `Pending`.
    pub fn submit(owner: UserId, amount: Amount, term: u32, submitted_at: DateTime<Utc>) -> Result<Self> {
        if term == 0 {
            return Err(LoanError::validation("term", "Term must be positive"));
        }
        Ok(Self {
            id: LoanId::new(),
            owner,
            amount,
            term,
            status: LoanStatus::Pending,
            submitted_at,
            approved_on: None,
        })
    }

    pub fn approve(&mut self, today: NaiveDate) -> Result<()> {
        self.transition(LoanStatus::Approved)?;
        self.approved_on = Some(today);
        Ok(())
    }

    pub fn reject(&mut self) -> Result<()> {
        self.transition(LoanStatus::Rejected)
    }

    pub fn cancel(&mut self) -> Result<()> {
        self.transition(LoanStatus::Cancelled)
    }

    /// Marks the loan as settled. Only reconciliation should call this.
    pub fn mark_paid(&mut self) -> Result<()> {
        self.transition(LoanStatus::Paid)
    }

    fn transition(&mut self, next: LoanStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(LoanError::InvalidState(format!(
                "Loan {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

/// A loan together with its ordered installments.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LoanDetails {
    pub loan: Loan,
    pub repayments: Vec<Repayment>,
}

impl LoanDetails {
    /// Installments that have not been paid yet.
    pub fn outstanding(&self) -> usize {
        self.repayments.iter().filter(|r| !r.is_paid()).count()
    }
}
