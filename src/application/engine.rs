use crate::domain::access::{Action, Actor, Target, UserId};
use crate::domain::loan::{Loan, LoanDetails, LoanId};
use crate::domain::money::Amount;
use crate::domain::ports::{AuthorizationGateBox, ChangeSet, ClockBox, LedgerStoreBox};
use crate::domain::reconciliation;
use crate::domain::repayment::{Repayment, RepaymentId};
use crate::domain::schedule;
use crate::error::{LoanError, Result};
use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// The entry point for the loan and repayment lifecycle.
///
/// `LoanEngine` owns the ledger store, the authorization gate and the clock.
/// Every mutating operation reads, validates and commits while holding the
/// engine's write guard, so operations on the same loan never interleave and
/// each one lands as a single `ChangeSet`.
///
/// The guard is engine-wide, so writes to unrelated loans are serialized
/// too. That caps write throughput at one operation at a time; reads do not
/// take the guard.
pub struct LoanEngine {
    store: LedgerStoreBox,
    gate: AuthorizationGateBox,
    clock: ClockBox,
    write_guard: Mutex<()>,
}

impl LoanEngine {
    /// Creates a new `LoanEngine` instance.
    ///
    /// # Arguments
    ///
    /// * `store` - Where loans and repayments are kept.
    /// * `gate` - Decides whether an actor may view, approve or update.
    /// * `clock` - Source of submission timestamps and approval dates.
    pub fn new(store: LedgerStoreBox, gate: AuthorizationGateBox, clock: ClockBox) -> Self {
        Self {
            store,
            gate,
            clock,
            write_guard: Mutex::new(()),
        }
    }

    /// Submits a new loan for `owner` and schedules its installments.
    ///
    /// The loan and all of its installments are committed together.
    pub async fn submit_loan(
        &self,
        principal: Decimal,
        term: u32,
        owner: UserId,
    ) -> Result<LoanDetails> {
        let submitted_at = self.clock.now();
        let amount = Amount::new(principal)?;
        let loan = Loan::submit(owner, amount, term, submitted_at)?;
        let repayments: Vec<Repayment> = schedule::generate(principal, term, submitted_at.date_naive())?
            .iter()
            .map(|installment| Repayment::scheduled(loan.id, installment))
            .collect();

        let _guard = self.write_guard.lock().await;
        let mut changes = ChangeSet::new();
        changes
            .put_loan(loan.clone())
            .put_repayments(repayments.iter().cloned());
        self.store.commit(changes).await?;

        info!(loan_id = %loan.id, owner = %owner, amount = %amount, term, "Loan submitted");
        Ok(LoanDetails { loan, repayments })
    }

    /// Approves a pending loan and makes all of its installments payable.
    pub async fn approve_loan(&self, loan_id: LoanId, actor: &Actor) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut loan = self.load_loan(loan_id).await?;
        self.authorize(actor, Action::Approve, Target::Loan(&loan))?;

        loan.approve(self.clock.today())?;
        let mut repayments = self.store.repayments_for(loan_id).await?;
        for repayment in &mut repayments {
            repayment.approve()?;
        }

        let installments = repayments.len();
        let mut changes = ChangeSet::new();
        changes.put_loan(loan).put_repayments(repayments);
        self.store.commit(changes).await?;

        info!(loan_id = %loan_id, actor = %actor, installments, "Loan approved");
        Ok(())
    }

    /// Rejects a pending loan. Its installments stay pending for good.
    pub async fn reject_loan(&self, loan_id: LoanId, actor: &Actor) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut loan = self.load_loan(loan_id).await?;
        self.authorize(actor, Action::Approve, Target::Loan(&loan))?;

        loan.reject()?;
        let mut changes = ChangeSet::new();
        changes.put_loan(loan);
        self.store.commit(changes).await?;

        info!(loan_id = %loan_id, actor = %actor, "Loan rejected");
        Ok(())
    }

    /// Withdraws a pending loan on behalf of its owner (or an admin).
    pub async fn cancel_loan(&self, loan_id: LoanId, actor: &Actor) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut loan = self.load_loan(loan_id).await?;
        self.authorize(actor, Action::Update, Target::Loan(&loan))?;

        loan.cancel()?;
        let mut changes = ChangeSet::new();
        changes.put_loan(loan);
        self.store.commit(changes).await?;

        info!(loan_id = %loan_id, actor = %actor, "Loan cancelled");
        Ok(())
    }

    /// Returns a loan with its installments.
    pub async fn view_loan(&self, loan_id: LoanId, actor: &Actor) -> Result<LoanDetails> {
        let loan = self.load_loan(loan_id).await?;
        self.authorize(actor, Action::View, Target::Loan(&loan))?;
        let repayments = self.store.repayments_for(loan_id).await?;
        debug!(loan_id = %loan_id, actor = %actor, "Loan viewed");
        Ok(LoanDetails { loan, repayments })
    }

    /// Lists every loan `actor` may view, oldest submission first.
    pub async fn list_loans(&self, actor: &Actor) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .store
            .loans()
            .await?
            .into_iter()
            .filter(|loan| self.gate.can(actor, Action::View, Target::Loan(loan)))
            .collect();
        loans.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at).then(a.id.cmp(&b.id)));
        debug!(actor = %actor, count = loans.len(), "Loans listed");
        Ok(loans)
    }

    /// Pays one installment and settles the loan if it was the last one due.
    ///
    /// The installment update and the loan's promotion to `Paid` are committed
    /// together.
    pub async fn pay_repayment(
        &self,
        repayment_id: RepaymentId,
        tendered: Decimal,
        actor: &Actor,
    ) -> Result<()> {
        let _guard = self.write_guard.lock().await;
        let mut repayment = self
            .store
            .repayment(repayment_id)
            .await?
            .ok_or_else(|| LoanError::NotFound(format!("Repayment {repayment_id}")))?;
        let mut loan = self.load_loan(repayment.loan_id).await?;
        self.authorize(
            actor,
            Action::Update,
            Target::Repayment {
                repayment: &repayment,
                loan: &loan,
            },
        )?;

        repayment.pay(tendered)?;

        let mut siblings = self.store.repayments_for(loan.id).await?;
        for sibling in siblings.iter_mut().filter(|s| s.id == repayment.id) {
            *sibling = repayment.clone();
        }
        let settled = reconciliation::reconcile(&mut loan, &siblings)?;

        let loan_id = loan.id;
        let mut changes = ChangeSet::new();
        changes.put_repayment(repayment);
        if settled {
            changes.put_loan(loan);
        }
        self.store.commit(changes).await?;

        info!(
            repayment_id = %repayment_id,
            loan_id = %loan_id,
            actor = %actor,
            awaiting_payment = reconciliation::awaiting_payment(&siblings),
            "Repayment paid"
        );
        if settled {
            info!(loan_id = %loan_id, "Loan fully paid");
        }
        Ok(())
    }

    async fn load_loan(&self, loan_id: LoanId) -> Result<Loan> {
        self.store
            .loan(loan_id)
            .await?
            .ok_or_else(|| LoanError::NotFound(format!("Loan {loan_id}")))
    }

    fn authorize(&self, actor: &Actor, action: Action, target: Target<'_>) -> Result<()> {
        if self.gate.can(actor, action, target) {
            return Ok(());
        }
        warn!(actor = %actor, action = %action, loan_id = %target.loan().id, "Permission denied");
        Err(LoanError::Forbidden(format!(
            "{actor} may not {action} loan {}",
            target.loan().id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::loan::LoanStatus;
    use crate::domain::ports::LedgerStore;
    use crate::domain::repayment::RepaymentStatus;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::in_memory::InMemoryLedgerStore;
    use crate::infrastructure::policy::RolePolicy;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn engine_with(store: InMemoryLedgerStore) -> LoanEngine {
        let today = NaiveDate::from_ymd_opt(2023, 7, 12).unwrap();
        LoanEngine::new(Box::new(store), Box::new(RolePolicy), Box::new(FixedClock::on(today)))
    }

    fn engine() -> LoanEngine {
        engine_with(InMemoryLedgerStore::new())
    }

    #[tokio::test]
    async fn test_submit_persists_loan_and_schedule() {
        let store = InMemoryLedgerStore::new();
        let engine = engine_with(store.clone());

        let details = engine.submit_loan(dec!(5000), 5, UserId(7)).await.unwrap();
        assert_eq!(details.loan.status, LoanStatus::Pending);
        assert_eq!(details.repayments.len(), 5);

        assert_eq!(store.loan(details.loan.id).await.unwrap(), Some(details.loan.clone()));
        assert_eq!(store.repayments_for(details.loan.id).await.unwrap(), details.repayments);
    }

    #[tokio::test]
    async fn test_submit_rejects_invalid_input() {
        let engine = engine();
        assert!(matches!(
            engine.submit_loan(dec!(0), 5, UserId(1)).await,
            Err(LoanError::ValidationError { field: "amount", .. })
        ));
        assert!(matches!(
            engine.submit_loan(dec!(100), 0, UserId(1)).await,
            Err(LoanError::ValidationError { field: "term", .. })
        ));
        assert!(engine.list_loans(&Actor::admin(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_cascades_to_repayments() {
        let engine = engine();
        let admin = Actor::admin(1);
        let details = engine.submit_loan(dec!(900), 3, UserId(7)).await.unwrap();

        engine.approve_loan(details.loan.id, &admin).await.unwrap();

        let approved = engine.view_loan(details.loan.id, &admin).await.unwrap();
        assert_eq!(approved.loan.status, LoanStatus::Approved);
        assert_eq!(approved.loan.approved_on, NaiveDate::from_ymd_opt(2023, 7, 12));
        assert!(
            approved
                .repayments
                .iter()
                .all(|r| r.status == RepaymentStatus::Approved)
        );
    }

    #[tokio::test]
    async fn test_second_approve_is_invalid_state() {
        let engine = engine();
        let admin = Actor::admin(1);
        let details = engine.submit_loan(dec!(900), 3, UserId(7)).await.unwrap();
        engine.approve_loan(details.loan.id, &admin).await.unwrap();
        let before = engine.view_loan(details.loan.id, &admin).await.unwrap();

        let result = engine.approve_loan(details.loan.id, &admin).await;
        assert!(matches!(result, Err(LoanError::InvalidState(_))));
        assert_eq!(engine.view_loan(details.loan.id, &admin).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_owner_cannot_approve() {
        let engine = engine();
        let owner = Actor::user(7);
        let details = engine.submit_loan(dec!(900), 3, owner.id).await.unwrap();

        let result = engine.approve_loan(details.loan.id, &owner).await;
        assert!(matches!(result, Err(LoanError::Forbidden(_))));
        let view = engine.view_loan(details.loan.id, &owner).await.unwrap();
        assert_eq!(view.loan.status, LoanStatus::Pending);
    }

    #[tokio::test]
    async fn test_forbidden_checked_before_state() {
        let engine = engine();
        let admin = Actor::admin(1);
        let details = engine.submit_loan(dec!(900), 3, UserId(7)).await.unwrap();
        engine.approve_loan(details.loan.id, &admin).await.unwrap();

        let result = engine.approve_loan(details.loan.id, &Actor::user(7)).await;
        assert!(matches!(result, Err(LoanError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_pay_flow_settles_loan_on_last_installment() {
        let engine = engine();
        let admin = Actor::admin(1);
        let owner = Actor::user(7);
        let details = engine.submit_loan(dec!(300), 3, owner.id).await.unwrap();
        engine.approve_loan(details.loan.id, &admin).await.unwrap();

        for (index, repayment) in details.repayments.iter().enumerate() {
            engine.pay_repayment(repayment.id, dec!(100), &owner).await.unwrap();
            let view = engine.view_loan(details.loan.id, &owner).await.unwrap();
            let expected = if index + 1 < details.repayments.len() {
                LoanStatus::Approved
            } else {
                LoanStatus::Paid
            };
            assert_eq!(view.loan.status, expected);
            assert_eq!(view.outstanding(), details.repayments.len() - index - 1);
        }
    }

    #[tokio::test]
    async fn test_pay_unapproved_loan() {
        let engine = engine();
        let owner = Actor::user(7);
        let details = engine.submit_loan(dec!(300), 3, owner.id).await.unwrap();

        let result = engine
            .pay_repayment(details.repayments[0].id, dec!(1000000), &owner)
            .await;
        assert!(matches!(result, Err(LoanError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_pay_underpayment_leaves_status() {
        let engine = engine();
        let owner = Actor::user(7);
        let details = engine.submit_loan(dec!(300), 3, owner.id).await.unwrap();
        engine.approve_loan(details.loan.id, &Actor::admin(1)).await.unwrap();

        let result = engine
            .pay_repayment(details.repayments[0].id, dec!(99.99), &owner)
            .await;
        assert!(matches!(
            result,
            Err(LoanError::ValidationError { field: "amount", .. })
        ));
        let view = engine.view_loan(details.loan.id, &owner).await.unwrap();
        assert_eq!(view.repayments[0].status, RepaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_pay_unknown_repayment() {
        let engine = engine();
        let result = engine
            .pay_repayment(RepaymentId::new(), dec!(10), &Actor::admin(1))
            .await;
        assert!(matches!(result, Err(LoanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_reject_and_cancel() {
        let engine = engine();
        let admin = Actor::admin(1);
        let owner = Actor::user(7);
        let rejected = engine.submit_loan(dec!(100), 2, owner.id).await.unwrap();
        let cancelled = engine.submit_loan(dec!(100), 2, owner.id).await.unwrap();

        assert!(matches!(
            engine.reject_loan(rejected.loan.id, &owner).await,
            Err(LoanError::Forbidden(_))
        ));
        engine.reject_loan(rejected.loan.id, &admin).await.unwrap();
        assert!(matches!(
            engine.cancel_loan(cancelled.loan.id, &Actor::user(8)).await,
            Err(LoanError::Forbidden(_))
        ));
        engine.cancel_loan(cancelled.loan.id, &owner).await.unwrap();

        let view = engine.view_loan(rejected.loan.id, &owner).await.unwrap();
        assert_eq!(view.loan.status, LoanStatus::Rejected);
        assert!(
            view.repayments
                .iter()
                .all(|r| r.status == RepaymentStatus::Pending)
        );
        assert!(matches!(
            engine.approve_loan(rejected.loan.id, &admin).await,
            Err(LoanError::InvalidState(_))
        ));

        let view = engine.view_loan(cancelled.loan.id, &owner).await.unwrap();
        assert_eq!(view.loan.status, LoanStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_list_loans_scoped_to_actor() {
        let engine = engine();
        let mine = engine.submit_loan(dec!(100), 2, UserId(7)).await.unwrap();
        engine.submit_loan(dec!(200), 2, UserId(8)).await.unwrap();

        let own = engine.list_loans(&Actor::user(7)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].id, mine.loan.id);

        assert_eq!(engine.list_loans(&Actor::admin(1)).await.unwrap().len(), 2);
        assert!(engine.list_loans(&Actor::user(9)).await.unwrap().is_empty());
    }
}
