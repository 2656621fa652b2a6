use crate::domain::loan::{Loan, LoanId};
use crate::domain::ports::{ChangeSet, LedgerStore};
use crate::domain::repayment::{Repayment, RepaymentId};
use crate::error::{LoanError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing loans.
pub const CF_LOANS: &str = "loans";
/// Column Family for storing repayments.
pub const CF_REPAYMENTS: &str = "repayments";
/// Column Family indexing repayments by owning loan.
///
/// Keys are `loan_id ++ repayment_id`, values are empty.
pub const CF_LOAN_REPAYMENTS: &str = "loan_repayments";

/// A persistent ledger implementation using RocksDB.
///
/// Loans and repayments live in separate Column Families, with a third one
/// acting as the loan -> repayments index. Every commit is written as a single
/// `WriteBatch`, which RocksDB applies atomically.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    ///
    /// # Arguments
    ///
    /// * `path` - The filesystem path where the database will be stored.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let descriptors = [CF_LOANS, CF_REPAYMENTS, CF_LOAN_REPAYMENTS]
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&opts, path, descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LoanError::internal(format!("Column family `{name}` not found")))
    }

    fn get_json<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_pinned_cf(cf, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn index_key(loan_id: &LoanId, repayment_id: &RepaymentId) -> [u8; 32] {
        let mut key = [0u8; 32];
        key[..16].copy_from_slice(loan_id.as_bytes());
        key[16..].copy_from_slice(repayment_id.as_bytes());
        key
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.get_json(CF_LOANS, id.as_bytes())
    }

    async fn loans(&self) -> Result<Vec<Loan>> {
        let cf = self.cf(CF_LOANS)?;
        let mut loans = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_key, value) = item?;
            loans.push(serde_json::from_slice(&value)?);
        }
        Ok(loans)
    }

    async fn repayment(&self, id: RepaymentId) -> Result<Option<Repayment>> {
        self.get_json(CF_REPAYMENTS, id.as_bytes())
    }

    async fn repayments_for(&self, loan_id: LoanId) -> Result<Vec<Repayment>> {
        let index = self.cf(CF_LOAN_REPAYMENTS)?;
        let prefix: &[u8] = loan_id.as_bytes();

        let mut repayments = Vec::new();
        let iter = self
            .db
            .iterator_cf(index, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            let repayment: Repayment = self
                .get_json(CF_REPAYMENTS, &key[16..])?
                .ok_or_else(|| LoanError::internal(format!("Dangling repayment index for loan {loan_id}")))?;
            repayments.push(repayment);
        }
        repayments.sort_by_key(|r: &Repayment| r.sequence);
        Ok(repayments)
    }

    async fn commit(&self, changes: ChangeSet) -> Result<()> {
        let loans_cf = self.cf(CF_LOANS)?;
        let repayments_cf = self.cf(CF_REPAYMENTS)?;
        let index_cf = self.cf(CF_LOAN_REPAYMENTS)?;

        let mut batch = WriteBatch::default();
        for loan in &changes.loans {
            batch.put_cf(loans_cf, loan.id.as_bytes(), serde_json::to_vec(loan)?);
        }
        for repayment in &changes.repayments {
            let parent_known = changes.loans.iter().any(|l| l.id == repayment.loan_id)
                || self.db.get_pinned_cf(loans_cf, repayment.loan_id.as_bytes())?.is_some();
            if !parent_known {
                return Err(LoanError::internal(format!(
                    "Repayment {} references unknown loan {}",
                    repayment.id, repayment.loan_id
                )));
            }
            if let Some(existing) = self.get_json::<Repayment>(CF_REPAYMENTS, repayment.id.as_bytes())?
                && existing.loan_id != repayment.loan_id
            {
                return Err(LoanError::internal(format!(
                    "Repayment {} cannot move to loan {}",
                    repayment.id, repayment.loan_id
                )));
            }
            batch.put_cf(repayments_cf, repayment.id.as_bytes(), serde_json::to_vec(repayment)?);
            batch.put_cf(index_cf, Self::index_key(&repayment.loan_id, &repayment.id), b"");
        }

        self.db.write(batch)?;
        Ok(())
    }
}
