use crate::domain::loan::{Loan, LoanId};
use crate::domain::ports::{ChangeSet, LedgerStore};
use crate::domain::repayment::{Repayment, RepaymentId};
use crate::error::{LoanError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    loans: HashMap<LoanId, Loan>,
    repayments: HashMap<RepaymentId, Repayment>,
    /// Repayment ids owned by each loan, in insertion order.
    by_loan: HashMap<LoanId, Vec<RepaymentId>>,
}

/// A thread-safe in-memory ledger.
///
/// All tables sit behind a single `RwLock`, so a commit holds the write lock
/// for its whole change set and readers never observe half of one.
/// Ideal for testing or short-lived runs where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLedgerStore {
    /// Creates a new, empty in-memory ledger.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.get(&id).cloned())
    }

    async fn loans(&self) -> Result<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables.loans.values().cloned().collect())
    }

    async fn repayment(&self, id: RepaymentId) -> Result<Option<Repayment>> {
        let tables = self.tables.read().await;
        Ok(tables.repayments.get(&id).cloned())
    }

    async fn repayments_for(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        let tables = self.tables.read().await;
        let mut repayments: Vec<Repayment> = tables
            .by_loan
            .get(&loan_id)
            .into_iter()
            .flatten()
            .filter_map(|id| tables.repayments.get(id).cloned())
            .collect();
        repayments.sort_by_key(|r| r.sequence);
        Ok(repayments)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let mut tables = self.tables.write().await;

        // Validate the whole set before touching any table.
        for repayment in &changes.repayments {
            let parent_known = tables.loans.contains_key(&repayment.loan_id)
                || changes.loans.iter().any(|l| l.id == repayment.loan_id);
            if !parent_known {
                return Err(LoanError::internal(format!(
                    "Repayment {} references unknown loan {}",
                    repayment.id, repayment.loan_id
                )));
            }
            if let Some(existing) = tables.repayments.get(&repayment.id)
                && existing.loan_id != repayment.loan_id
            {
                return Err(LoanError::internal(format!(
                    "Repayment {} cannot move to loan {}",
                    repayment.id, repayment.loan_id
                )));
            }
        }

        for loan in changes.loans {
            tables.loans.insert(loan.id, loan);
        }
        for repayment in changes.repayments {
            if !tables.repayments.contains_key(&repayment.id) {
                tables
                    .by_loan
                    .entry(repayment.loan_id)
                    .or_default()
                    .push(repayment.id);
            }
            tables.repayments.insert(repayment.id, repayment);
        }
        Ok(())
    }
}
