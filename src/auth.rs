//! Authorization contexts for administrative operations.
//!
//! Instead of ambient permission state, every administrative entry point takes
//! the caller's account and checks it against a capability table held by the
//! ledger. Liquidator eligibility is a governance-token balance threshold, not
//! a role, and lives with the liquidation path.

use crate::types::AccountId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Privileged roles recognised by the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Lists assets, updates oracle and protocol configuration, controls
    /// circuit breakers.
    Manager,
    /// Pauses and resumes the protocol.
    Guardian,
    /// Feeds external state (oracle rounds, governance balances).
    Protocol,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("account {actor:?} lacks required role {required:?}")]
    Unauthorized { actor: AccountId, required: Role },
}

/// Capability table: which accounts hold which roles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Acl {
    grants: HashMap<AccountId, Vec<Role>>,
}

impl Acl {
    /// A table with `admin` holding every role.
    pub fn with_admin(admin: AccountId) -> Self {
        let mut acl = Self::default();
        acl.grant(admin, Role::Manager);
        acl.grant(admin, Role::Guardian);
        acl.grant(admin, Role::Protocol);
        acl
    }

    pub fn grant(&mut self, actor: AccountId, role: Role) {
        let roles = self.grants.entry(actor).or_default();
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    pub fn revoke(&mut self, actor: AccountId, role: Role) {
        if let Some(roles) = self.grants.get_mut(&actor) {
            roles.retain(|r| *r != role);
        }
    }

    pub fn has(&self, actor: AccountId, role: Role) -> bool {
        self.grants
            .get(&actor)
            .is_some_and(|roles| roles.contains(&role))
    }

    pub fn require(&self, actor: AccountId, role: Role) -> Result<(), AuthError> {
        if self.has(actor, role) {
            Ok(())
        } else {
            Err(AuthError::Unauthorized {
                actor,
                required: role,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_holds_all_roles() {
        let acl = Acl::with_admin(AccountId(1));
        for role in [Role::Manager, Role::Guardian, Role::Protocol] {
            assert!(acl.require(AccountId(1), role).is_ok());
        }
    }

    #[test]
    fn ungranted_actor_is_rejected() {
        let acl = Acl::with_admin(AccountId(1));
        let err = acl.require(AccountId(2), Role::Manager).unwrap_err();
        assert_eq!(
            err,
            AuthError::Unauthorized {
                actor: AccountId(2),
                required: Role::Manager
            }
        );
    }

    #[test]
    fn grant_and_revoke() {
        let mut acl = Acl::with_admin(AccountId(1));
        acl.grant(AccountId(2), Role::Guardian);
        assert!(acl.has(AccountId(2), Role::Guardian));
        assert!(!acl.has(AccountId(2), Role::Manager));

        acl.revoke(AccountId(2), Role::Guardian);
        assert!(!acl.has(AccountId(2), Role::Guardian));
    }

    #[test]
    fn double_grant_is_idempotent() {
        let mut acl = Acl::default();
        acl.grant(AccountId(3), Role::Protocol);
        acl.grant(AccountId(3), Role::Protocol);
        acl.revoke(AccountId(3), Role::Protocol);
        assert!(!acl.has(AccountId(3), Role::Protocol));
    }
}
