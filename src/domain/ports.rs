use super::access::{Action, Actor, Target};
use super::loan::{Loan, LoanId};
use super::repayment::{Repayment, RepaymentId};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

/// A set of loan and repayment upserts applied as one unit.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ChangeSet {
    pub loans: Vec<Loan>,
    pub repayments: Vec<Repayment>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_loan(&mut self, loan: Loan) -> &mut Self {
        self.loans.push(loan);
        self
    }

    pub fn put_repayment(&mut self, repayment: Repayment) -> &mut Self {
        self.repayments.push(repayment);
        self
    }

    pub fn put_repayments(&mut self, repayments: impl IntoIterator<Item = Repayment>) -> &mut Self {
        self.repayments.extend(repayments);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.loans.is_empty() && self.repayments.is_empty()
    }
}

/// Storage for loans and the repayments they own.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn loan(&self, id: LoanId) -> Result<Option<Loan>>;
    async fn loans(&self) -> Result<Vec<Loan>>;
    async fn repayment(&self, id: RepaymentId) -> Result<Option<Repayment>>;
    /// All repayments owned by `loan_id`, ordered by installment sequence.
    async fn repayments_for(&self, loan_id: LoanId) -> Result<Vec<Repayment>>;
    /// Applies every change in `changes`, or none of them.
    async fn commit(&self, changes: ChangeSet) -> Result<()>;
}

/// Yes/no capability decisions for an actor on a loan or repayment.
pub trait AuthorizationGate: Send + Sync {
    fn can(&self, actor: &Actor, action: Action, target: Target<'_>) -> bool;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

pub type LedgerStoreBox = Box<dyn LedgerStore>;
pub type AuthorizationGateBox = Box<dyn AuthorizationGate>;
pub type ClockBox = Box<dyn Clock>;
