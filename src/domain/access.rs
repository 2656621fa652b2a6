use super::loan::Loan;
use super::repayment::Repayment;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// The principal invoking a core operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn admin(id: u64) -> Self {
        Self::new(UserId(id), Role::Admin)
    }

    pub fn user(id: u64) -> Self {
        Self::new(UserId(id), Role::User)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role {
            Role::Admin => write!(f, "admin:{}", self.id),
            Role::User => write!(f, "user:{}", self.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    Approve,
    Update,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::View => "view",
            Action::Approve => "approve",
            Action::Update => "update",
        })
    }
}

/// The entity an authorization decision is made about.
///
/// A repayment always travels with its parent loan, since ownership is
/// recorded on the loan.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Loan(&'a Loan),
    Repayment {
        repayment: &'a Repayment,
        loan: &'a Loan,
    },
}

impl Target<'_> {
    /// The loan whose owner governs access to this target.
    pub fn loan(&self) -> &Loan {
        match self {
            Target::Loan(loan) => loan,
            Target::Repayment { loan, .. } => loan,
        }
    }
}
