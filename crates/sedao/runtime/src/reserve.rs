//! Reserve Accessor - the payment-asset boundary
//!
//! The ledger never owns payment-asset balances directly. It pulls funds
//! from members into its reserve (spending an allowance the member
//! granted) and pushes funds out of the reserve. Both directions fail
//! closed.

use sedao_types::{Amount, Principal, ReserveError};
use std::collections::HashMap;
use tracing::debug;

/// Narrow capability over the external payment-asset ledger
pub trait ReserveAccessor: Send {
    /// Reference of the asset this accessor moves
    fn asset(&self) -> &str;

    /// Pull `amount` from `from` into the reserve
    fn debit(&mut self, from: &Principal, amount: Amount) -> Result<(), ReserveError>;

    /// Push `amount` from the reserve to `to`
    fn credit(&mut self, to: &Principal, amount: Amount) -> Result<(), ReserveError>;

    /// Payment-asset balance of a principal
    fn balance_of(&self, owner: &Principal) -> Amount;

    /// Balance held by the ledger itself
    fn reserve_balance(&self) -> Amount;
}

/// Member-side surface of the payment-asset ledger
///
/// Members fund their accounts and grant or withdraw the ledger's allowance
/// here. None of these calls moves the reserve.
pub trait ExternalAccounts {
    /// Issue payment-asset units to a principal
    fn fund(&mut self, to: &Principal, amount: Amount);

    /// Set the allowance `owner` grants the ledger
    fn approve(&mut self, owner: &Principal, amount: Amount);

    /// Withdraw the allowance entirely
    fn revoke(&mut self, owner: &Principal);
}

/// Allowance value treated as unlimited (never decremented)
pub const UNLIMITED_ALLOWANCE: Amount = Amount(u128::MAX);

/// In-memory payment-asset ledger with allowances
///
/// Allowances are checked before balances, so a member who approved
/// too little sees `InsufficientAllowance` even when underfunded.
#[derive(Clone, Debug)]
pub struct InMemoryReserve {
    asset: String,
    balances: HashMap<Principal, Amount>,
    allowances: HashMap<Principal, Amount>,
    reserve: Amount,
}

impl InMemoryReserve {
    pub fn new(asset: impl Into<String>) -> Self {
        Self {
            asset: asset.into(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            reserve: Amount::zero(),
        }
    }

    /// Issue payment-asset units to a principal (test and simulation setup)
    pub fn fund(&mut self, to: &Principal, amount: Amount) {
        let balance = self.balances.entry(to.clone()).or_default();
        *balance = balance.saturating_add(amount);
    }

    /// Set the allowance `owner` grants the ledger
    pub fn approve(&mut self, owner: &Principal, amount: Amount) {
        self.allowances.insert(owner.clone(), amount);
    }

    /// Withdraw the allowance entirely
    pub fn revoke(&mut self, owner: &Principal) {
        self.allowances.remove(owner);
    }

    pub fn allowance(&self, owner: &Principal) -> Amount {
        self.allowances.get(owner).copied().unwrap_or_default()
    }

    /// Sum of all balances including the reserve (constant under debit/credit)
    pub fn total_issued(&self) -> Amount {
        self.balances
            .values()
            .fold(self.reserve, |acc, b| acc.saturating_add(*b))
    }
}

impl ExternalAccounts for InMemoryReserve {
    fn fund(&mut self, to: &Principal, amount: Amount) {
        InMemoryReserve::fund(self, to, amount)
    }

    fn approve(&mut self, owner: &Principal, amount: Amount) {
        InMemoryReserve::approve(self, owner, amount)
    }

    fn revoke(&mut self, owner: &Principal) {
        InMemoryReserve::revoke(self, owner)
    }
}

impl ReserveAccessor for InMemoryReserve {
    fn asset(&self) -> &str {
        &self.asset
    }

    fn debit(&mut self, from: &Principal, amount: Amount) -> Result<(), ReserveError> {
        let allowed = self.allowance(from);
        if allowed < amount {
            return Err(ReserveError::InsufficientAllowance {
                required: amount,
                allowed,
            });
        }
        let available = self.balance_of(from);
        if available < amount {
            return Err(ReserveError::InsufficientFunds {
                required: amount,
                available,
            });
        }
        let reserve = self
            .reserve
            .0
            .checked_add(amount.0)
            .ok_or(ReserveError::Overflow)?;

        self.reserve = Amount(reserve);
        self.balances.insert(from.clone(), available.saturating_sub(amount));
        if allowed != UNLIMITED_ALLOWANCE {
            self.allowances
                .insert(from.clone(), allowed.saturating_sub(amount));
        }

        debug!(from = %from, amount = amount.0, "Reserve debit");
        Ok(())
    }

    fn credit(&mut self, to: &Principal, amount: Amount) -> Result<(), ReserveError> {
        if self.reserve < amount {
            return Err(ReserveError::InsufficientFunds {
                required: amount,
                available: self.reserve,
            });
        }
        let balance = self.balance_of(to);
        let balance = balance
            .0
            .checked_add(amount.0)
            .ok_or(ReserveError::Overflow)?;

        self.reserve = self.reserve.saturating_sub(amount);
        self.balances.insert(to.clone(), Amount(balance));

        debug!(to = %to, amount = amount.0, "Reserve credit");
        Ok(())
    }

    fn balance_of(&self, owner: &Principal) -> Amount {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn reserve_balance(&self) -> Amount {
        self.reserve
    }
}

/// Reserve accessor that tallies the flows the ledger initiates
///
/// The reserve balance must always equal the opening balance plus metered
/// inflows minus metered outflows.
#[derive(Debug)]
pub(crate) struct MeteredReserve<R> {
    inner: R,
    opening: Amount,
    inflow: Amount,
    outflow: Amount,
}

impl<R: ReserveAccessor> MeteredReserve<R> {
    pub(crate) fn new(inner: R) -> Self {
        let opening = inner.reserve_balance();
        Self {
            inner,
            opening,
            inflow: Amount::zero(),
            outflow: Amount::zero(),
        }
    }

    pub(crate) fn inner(&self) -> &R {
        &self.inner
    }

    /// Reserve balance explained by the metered flows (None on overflow)
    pub(crate) fn expected_balance(&self) -> Option<Amount> {
        self.opening
            .0
            .checked_add(self.inflow.0)?
            .checked_sub(self.outflow.0)
            .map(Amount)
    }
}

impl<R: ReserveAccessor> ReserveAccessor for MeteredReserve<R> {
    fn asset(&self) -> &str {
        self.inner.asset()
    }

    fn debit(&mut self, from: &Principal, amount: Amount) -> Result<(), ReserveError> {
        self.inner.debit(from, amount)?;
        self.inflow = self.inflow.saturating_add(amount);
        Ok(())
    }

    fn credit(&mut self, to: &Principal, amount: Amount) -> Result<(), ReserveError> {
        self.inner.credit(to, amount)?;
        self.outflow = self.outflow.saturating_add(amount);
        Ok(())
    }

    fn balance_of(&self, owner: &Principal) -> Amount {
        self.inner.balance_of(owner)
    }

    fn reserve_balance(&self) -> Amount {
        self.inner.reserve_balance()
    }
}

impl<R: ExternalAccounts> ExternalAccounts for MeteredReserve<R> {
    fn fund(&mut self, to: &Principal, amount: Amount) {
        self.inner.fund(to, amount)
    }

    fn approve(&mut self, owner: &Principal, amount: Amount) {
        self.inner.approve(owner, amount)
    }

    fn revoke(&mut self, owner: &Principal) {
        self.inner.revoke(owner)
    }
}
