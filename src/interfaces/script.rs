use super::csv::command_reader::{Command, CommandType};
use crate::application::engine::LoanEngine;
use crate::domain::access::Actor;
use crate::domain::loan::{LoanDetails, LoanId};
use crate::domain::repayment::RepaymentId;
use crate::error::{LoanError, Result};
use tracing::info;

struct ScriptedLoan {
    id: LoanId,
    repayments: Vec<RepaymentId>,
}

/// Drives a `LoanEngine` from a command script.
///
/// Loans are referenced by the order in which the script submitted them, so
/// scripts never need to know the generated identifiers.
pub struct ScriptRunner<'a> {
    engine: &'a LoanEngine,
    loans: Vec<ScriptedLoan>,
}

impl<'a> ScriptRunner<'a> {
    pub fn new(engine: &'a LoanEngine) -> Self {
        Self {
            engine,
            loans: Vec::new(),
        }
    }

    pub async fn execute(&mut self, command: Command) -> Result<()> {
        let actor = command.actor();
        match command.r#type {
            CommandType::Submit => {
                let details = self
                    .engine
                    .submit_loan(command.require_amount()?, command.require_term()?, actor.id)
                    .await?;
                self.loans.push(ScriptedLoan {
                    id: details.loan.id,
                    repayments: details.repayments.iter().map(|r| r.id).collect(),
                });
            }
            CommandType::Approve => {
                let loan_id = self.loan(&command)?.id;
                self.engine.approve_loan(loan_id, &actor).await?;
            }
            CommandType::Reject => {
                let loan_id = self.loan(&command)?.id;
                self.engine.reject_loan(loan_id, &actor).await?;
            }
            CommandType::Cancel => {
                let loan_id = self.loan(&command)?.id;
                self.engine.cancel_loan(loan_id, &actor).await?;
            }
            CommandType::View => {
                let loan_id = self.loan(&command)?.id;
                let details = self.engine.view_loan(loan_id, &actor).await?;
                info!(
                    loan_id = %loan_id,
                    status = %details.loan.status,
                    outstanding = details.outstanding(),
                    "Loan status"
                );
            }
            CommandType::Pay => {
                let repayment_id = self.repayment(&command)?;
                self.engine
                    .pay_repayment(repayment_id, command.require_amount()?, &actor)
                    .await?;
            }
        }
        Ok(())
    }

    /// Every loan visible to `actor`, with its installments.
    pub async fn report(&self, actor: &Actor) -> Result<Vec<LoanDetails>> {
        let mut report = Vec::new();
        for loan in self.engine.list_loans(actor).await? {
            report.push(self.engine.view_loan(loan.id, actor).await?);
        }
        Ok(report)
    }

    fn loan(&self, command: &Command) -> Result<&ScriptedLoan> {
        let position = command.require_loan()?;
        position
            .checked_sub(1)
            .and_then(|index| self.loans.get(index))
            .ok_or_else(|| LoanError::NotFound(format!("Loan #{position} in script")))
    }

    fn repayment(&self, command: &Command) -> Result<RepaymentId> {
        let loan = self.loan(command)?;
        let installment = command.require_installment()?;
        installment
            .checked_sub(1)
            .and_then(|index| loan.repayments.get(index as usize))
            .copied()
            .ok_or_else(|| LoanError::NotFound(format!("Installment {installment} of loan {}", loan.id)))
    }
}
