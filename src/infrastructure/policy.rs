use crate::domain::access::{Action, Actor, Role, Target};
use crate::domain::ports::AuthorizationGate;

/// Role-based authorization.
///
/// Admins may do anything. Other principals may view and update loans (and
/// their repayments) they own, and may never approve.
#[derive(Debug, Default, Clone, Copy)]
pub struct RolePolicy;

impl AuthorizationGate for RolePolicy {
    fn can(&self, actor: &Actor, action: Action, target: Target<'_>) -> bool {
        if actor.role == Role::Admin {
            return true;
        }
        match action {
            Action::View | Action::Update => target.loan().owner == actor.id,
            Action::Approve => false,
        }
    }
}
