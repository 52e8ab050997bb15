//! Caller authorization for mutating ledger operations
//!
//! The ledger asks its guard before touching the pool or the chain. Policies
//! are swappable without changing ledger internals.

use crate::crypto::{address_to_hex, Address};
use std::collections::HashSet;

pub trait AccessGuard: Send + Sync {
    fn authorize(&self, caller: &Address) -> bool;

    /// Short policy name for logs and status output.
    fn policy(&self) -> &'static str;
}

/// Any caller may submit and mine.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAccess;

impl AccessGuard for OpenAccess {
    fn authorize(&self, _caller: &Address) -> bool {
        true
    }

    fn policy(&self) -> &'static str {
        "open"
    }
}

/// Only a single owner address may mutate the ledger.
#[derive(Debug, Clone)]
pub struct OwnerOnly {
    owner: Address,
}

impl OwnerOnly {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }
}

impl AccessGuard for OwnerOnly {
    fn authorize(&self, caller: &Address) -> bool {
        *caller == self.owner
    }

    fn policy(&self) -> &'static str {
        "owner"
    }
}

/// A fixed set of permitted callers.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    allowed: HashSet<Address>,
}

impl AllowList {
    pub fn new(allowed: impl IntoIterator<Item = Address>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.allowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.allowed.is_empty()
    }
}

impl AccessGuard for AllowList {
    fn authorize(&self, caller: &Address) -> bool {
        self.allowed.contains(caller)
    }

    fn policy(&self) -> &'static str {
        "allow_list"
    }
}

pub(crate) fn denial_message(guard: &dyn AccessGuard, caller: &Address, action: &str) -> String {
    format!(
        "caller {} may not {} under the '{}' policy",
        address_to_hex(caller),
        action,
        guard.policy()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::address_from_string;

    #[test]
    fn test_open_access_allows_everyone() {
        assert!(OpenAccess.authorize(&[0u8; 32]));
        assert!(OpenAccess.authorize(&address_from_string("anyone")));
    }

    #[test]
    fn test_owner_only() {
        let owner = address_from_string("owner");
        let guard = OwnerOnly::new(owner);
        assert!(guard.authorize(&owner));
        assert!(!guard.authorize(&address_from_string("intruder")));
    }

    #[test]
    fn test_allow_list() {
        let alice = address_from_string("alice");
        let bob = address_from_string("bob");
        let guard = AllowList::new([alice, bob]);

        assert_eq!(guard.len(), 2);
        assert!(guard.authorize(&alice));
        assert!(guard.authorize(&bob));
        assert!(!guard.authorize(&address_from_string("carol")));
        assert!(!AllowList::default().authorize(&alice));
    }

    #[test]
    fn test_denial_message_names_caller_and_policy() {
        let caller = address_from_string("carol");
        let msg = denial_message(&AllowList::default(), &caller, "mine");
        assert!(msg.contains(&address_to_hex(&caller)));
        assert!(msg.contains("allow_list"));
    }
}
