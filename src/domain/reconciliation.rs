//! Promotion of a loan to `Paid` once its installments are settled.
//!
//! After approval every installment is `Approved`, so a loan is settled when
//! no installment is still `Approved`. Counting `Pending` installments
//! instead would mark a freshly approved loan as settled after its first
//! payment.

use super::loan::Loan;
use super::repayment::{Repayment, RepaymentStatus};
use crate::error::Result;

/// Approved installments not yet paid.
///
/// Unlike `LoanDetails::outstanding`, installments of a loan that was never
/// approved are not counted.
pub fn awaiting_payment(repayments: &[Repayment]) -> usize {
    repayments
        .iter()
        .filter(|r| r.status == RepaymentStatus::Approved)
        .count()
}

/// Marks `loan` as paid when none of `repayments` are awaiting payment.
///
/// `repayments` must be the loan's full installment set with the latest
/// payment already applied. Returns whether the loan changed.
pub fn reconcile(loan: &mut Loan, repayments: &[Repayment]) -> Result<bool> {
    if awaiting_payment(repayments) > 0 {
        return Ok(false);
    }
    loan.mark_paid()?;
    Ok(true)
}
