//! Access control - admin and oracle gates
//!
//! Pure predicates over an explicit role context; nothing ambient.

use sedao_types::{LedgerError, LedgerResult, Principal, Role};
use std::collections::BTreeSet;
use tracing::{info, warn};

/// The privileged principals of one ledger instance
#[derive(Clone, Debug)]
pub struct AccessControl {
    admin: Principal,
    oracles: BTreeSet<Principal>,
}

impl AccessControl {
    pub fn new(admin: Principal) -> Self {
        Self {
            admin,
            oracles: BTreeSet::new(),
        }
    }

    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    pub fn is_admin(&self, principal: &Principal) -> bool {
        &self.admin == principal
    }

    pub fn is_oracle(&self, principal: &Principal) -> bool {
        self.oracles.contains(principal)
    }

    pub fn oracles(&self) -> impl Iterator<Item = &Principal> {
        self.oracles.iter()
    }

    pub fn require_admin(&self, caller: &Principal) -> LedgerResult<()> {
        if self.is_admin(caller) {
            return Ok(());
        }
        warn!(caller = %caller, "Rejected: only admin");
        Err(LedgerError::Unauthorized {
            caller: caller.clone(),
            role: Role::Admin,
        })
    }

    pub fn require_oracle(&self, caller: &Principal) -> LedgerResult<()> {
        if self.is_oracle(caller) {
            return Ok(());
        }
        warn!(caller = %caller, "Rejected: not an oracle");
        Err(LedgerError::Unauthorized {
            caller: caller.clone(),
            role: Role::Oracle,
        })
    }

    /// Admin-only, idempotent. Returns whether the oracle was newly added.
    pub fn add_oracle(&mut self, caller: &Principal, oracle: Principal) -> LedgerResult<bool> {
        self.require_admin(caller)?;
        let added = self.oracles.insert(oracle.clone());
        if added {
            info!(oracle = %oracle, "Oracle added");
        }
        Ok(added)
    }
}
