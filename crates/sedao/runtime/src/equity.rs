//! Equity Ledger - the share-unit boundary
//!
//! Shares are minted and burned only by the cooperative ledger, which
//! owns its equity ledger and exposes it read-only. Transfers between
//! holders are disabled for everyone.

use sedao_types::{LedgerError, LedgerResult, Principal, Shares};
use std::collections::BTreeMap;

/// Narrow capability over the share-unit ledger
pub trait EquityLedger: Send {
    fn mint(&mut self, to: &Principal, shares: Shares) -> LedgerResult<()>;

    /// Fails with `ExceedsBalance` when burning more than held
    fn burn(&mut self, from: &Principal, shares: Shares) -> LedgerResult<()>;

    fn balance_of(&self, holder: &Principal) -> Shares;

    fn total_supply(&self) -> Shares;

    /// Every holder with a non-zero balance
    fn holders(&self) -> Vec<(Principal, Shares)>;

    /// Shares are non-transferable
    fn transfer(&mut self, _from: &Principal, _to: &Principal, _shares: Shares) -> LedgerResult<()> {
        Err(LedgerError::NonTransferable)
    }
}

/// In-memory share ledger
#[derive(Clone, Debug, Default)]
pub struct InMemoryEquity {
    balances: BTreeMap<Principal, Shares>,
    total_supply: Shares,
}

impl InMemoryEquity {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EquityLedger for InMemoryEquity {
    fn mint(&mut self, to: &Principal, shares: Shares) -> LedgerResult<()> {
        let supply = self.total_supply.checked_add(shares)?;
        let balance = self.balance_of(to).checked_add(shares)?;
        self.total_supply = supply;
        self.balances.insert(to.clone(), balance);
        Ok(())
    }

    fn burn(&mut self, from: &Principal, shares: Shares) -> LedgerResult<()> {
        let balance = self.balance_of(from);
        if balance < shares {
            return Err(LedgerError::ExceedsBalance {
                requested: shares,
                balance,
            });
        }
        let remaining = balance.saturating_sub(shares);
        if remaining.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(from.clone(), remaining);
        }
        self.total_supply = self.total_supply.saturating_sub(shares);
        Ok(())
    }

    fn balance_of(&self, holder: &Principal) -> Shares {
        self.balances.get(holder).copied().unwrap_or_default()
    }

    fn total_supply(&self) -> Shares {
        self.total_supply
    }

    fn holders(&self) -> Vec<(Principal, Shares)> {
        self.balances
            .iter()
            .map(|(p, s)| (p.clone(), *s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mint_and_burn() {
        let mut equity = InMemoryEquity::new();
        let alice = Principal::new("alice");

        equity.mint(&alice, Shares::new(100)).unwrap();
        assert_eq!(equity.total_supply(), Shares::new(100));

        equity.burn(&alice, Shares::new(40)).unwrap();
        assert_eq!(equity.balance_of(&alice), Shares::new(60));
        assert_eq!(equity.total_supply(), Shares::new(60));

        let result = equity.burn(&alice, Shares::new(61));
        assert!(matches!(result, Err(LedgerError::ExceedsBalance { .. })));
        assert_eq!(equity.total_supply(), Shares::new(60));
    }

    #[test]
    fn test_burning_everything_drops_holder() {
        let mut equity = InMemoryEquity::new();
        let bob = Principal::new("bob");
        equity.mint(&bob, Shares::new(5)).unwrap();
        equity.burn(&bob, Shares::new(5)).unwrap();
        assert!(equity.holders().is_empty());
    }

    #[test]
    fn test_transfer_disabled() {
        let mut equity = InMemoryEquity::new();
        let alice = Principal::new("alice");
        equity.mint(&alice, Shares::new(10)).unwrap();

        let result = equity.transfer(&alice, &Principal::new("eve"), Shares::new(1));
        assert_eq!(result, Err(LedgerError::NonTransferable));
        assert_eq!(equity.balance_of(&alice), Shares::new(10));
    }
}
