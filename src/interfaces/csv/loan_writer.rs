use crate::domain::loan::LoanDetails;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LoanRow<'a> {
    loan: String,
    owner: u64,
    amount: String,
    term: u32,
    status: &'a str,
    submitted: String,
    approved: Option<String>,
    outstanding: usize,
}

impl<'a> From<&'a LoanDetails> for LoanRow<'a> {
    fn from(details: &'a LoanDetails) -> Self {
        let loan = &details.loan;
        Self {
            loan: loan.id.to_string(),
            owner: loan.owner.0,
            amount: loan.amount.to_string(),
            term: loan.term,
            status: loan.status.as_str(),
            submitted: loan.submitted_at.date_naive().to_string(),
            approved: loan.approved_on.map(|d| d.to_string()),
            outstanding: details.outstanding(),
        }
    }
}

/// Writes one CSV row per loan.
///
/// Columns: `loan,owner,amount,term,status,submitted,approved,outstanding`,
/// where `outstanding` counts installments not yet paid.
pub struct LoanWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LoanWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_loans<'a>(&mut self, loans: impl IntoIterator<Item = &'a LoanDetails>) -> Result<()> {
        for details in loans {
            self.writer.serialize(LoanRow::from(details))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
