#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use loan_ledger::application::engine::LoanEngine;
use loan_ledger::domain::loan::{Loan, LoanId};
use loan_ledger::domain::ports::{ChangeSet, LedgerStore};
use loan_ledger::domain::repayment::{Repayment, RepaymentId};
use loan_ledger::error::{LoanError, Result};
use loan_ledger::infrastructure::clock::FixedClock;
use loan_ledger::infrastructure::in_memory::InMemoryLedgerStore;
use loan_ledger::infrastructure::policy::RolePolicy;
use std::fs::File;
use std::io::Error;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const HEADER: [&str; 7] = ["type", "actor", "role", "loan", "installment", "amount", "term"];

pub fn submission_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 7, 12).unwrap()
}

pub fn engine_with(store: impl LedgerStore + 'static) -> LoanEngine {
    LoanEngine::new(
        Box::new(store),
        Box::new(RolePolicy),
        Box::new(FixedClock::on(submission_date())),
    )
}

pub fn engine() -> LoanEngine {
    engine_with(InMemoryLedgerStore::new())
}

/// Wraps an in-memory ledger and fails every commit once armed, as a storage
/// outage would.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: InMemoryLedgerStore,
    failing: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_commits(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.inner.loan(id).await
    }

    async fn loans(&self) -> Result<Vec<Loan>> {
        self.inner.loans().await
    }

    async fn repayment(&self, id: RepaymentId) -> Result<Option<Repayment>> {
        self.inner.repayment(id).await
    }

    async fn repayments_for(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        self.inner.repayments_for(loan_id).await
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LoanError::from(std::io::Error::other("disk full")));
        }
        self.inner.commit(changes).await
    }
}

/// Writes a command script with `rows` submit commands for actor 1.
pub fn generate_script(path: &Path, rows: usize) -> std::result::Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(HEADER)?;
    for i in 1..=rows {
        let amount = (i * 100).to_string();
        wtr.write_record(["submit", "1", "user", "", "", amount.as_str(), "4"])?;
    }

    wtr.flush()?;
    Ok(())
}
