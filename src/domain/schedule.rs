use super::money::Amount;
use crate::error::{LoanError, Result};
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

const DAYS_PER_WEEK: u64 = 7;

/// One scheduled installment, before it is persisted as a repayment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Installment {
    /// 1-based position within the schedule.
    pub sequence: u32,
    pub amount: Amount,
    pub due_date: NaiveDate,
}

/// Produces `term` equal installments falling due weekly after `anchor`.
///
/// Installment `i` is due `i` weeks after `anchor`. The per-installment amount
/// is `principal / term` rounded half-up to cents, so the schedule total may
/// differ from `principal` by up to a cent per installment.
pub fn generate(principal: Decimal, term: u32, anchor: NaiveDate) -> Result<Vec<Installment>> {
    if term == 0 {
        return Err(LoanError::validation("term", "Term must be positive"));
    }
    let amount = Amount::new(principal)?.split(term)?;

    (1..=term)
        .map(|sequence| {
            let due_date = anchor
                .checked_add_days(Days::new(DAYS_PER_WEEK * u64::from(sequence)))
                .ok_or_else(|| {
                    LoanError::validation("term", format!("Installment {sequence} falls outside the calendar"))
                })?;
            Ok(Installment {
                sequence,
                amount,
                due_date,
            })
        })
        .collect()
}
