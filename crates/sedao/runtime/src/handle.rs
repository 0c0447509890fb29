//! Shared, serialized access to a ledger
//!
//! Every call takes the ledger lock for the whole operation, so no two
//! operations ever observe each other's intermediate state, regardless of
//! how many tasks hold a handle.

use crate::{
    equity::{EquityLedger, InMemoryEquity},
    ledger::CooperativeLedger,
    reserve::{ExternalAccounts, InMemoryReserve, ReserveAccessor},
};
use sedao_types::{
    Amount, DaoSettings, LedgerResult, PeriodId, Principal, SettlementBatch, SettlementReport,
    SharePrice, Shares,
};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// Cloneable async handle; clones share one ledger
pub struct LedgerHandle<R = InMemoryReserve, E = InMemoryEquity> {
    inner: Arc<Mutex<CooperativeLedger<R, E>>>,
}

impl<R, E> Clone for LedgerHandle<R, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R, E> LedgerHandle<R, E>
where
    R: ReserveAccessor,
    E: EquityLedger,
{
    pub fn new(ledger: CooperativeLedger<R, E>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    pub async fn initialize(&self, caller: &Principal, settings: DaoSettings) -> LedgerResult<()> {
        self.inner.lock().await.initialize(caller, settings)
    }

    pub async fn add_oracle(&self, caller: &Principal, oracle: Principal) -> LedgerResult<()> {
        self.inner.lock().await.add_oracle(caller, oracle)
    }

    pub async fn join(&self, caller: &Principal) -> LedgerResult<Shares> {
        self.inner.lock().await.join(caller)
    }

    pub async fn buy_shares(&self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        self.inner.lock().await.buy_shares(caller, amount)
    }

    pub async fn redeem_shares(&self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        self.inner.lock().await.redeem_shares(caller, amount)
    }

    pub async fn leave(&self, caller: &Principal) -> LedgerResult<Shares> {
        self.inner.lock().await.leave(caller)
    }

    pub async fn remove_member(&self, caller: &Principal, member: &Principal) -> LedgerResult<Shares> {
        self.inner.lock().await.remove_member(caller, member)
    }

    pub async fn transfer_shares(
        &self,
        caller: &Principal,
        to: &Principal,
        amount: Shares,
    ) -> LedgerResult<()> {
        self.inner.lock().await.transfer_shares(caller, to, amount)
    }

    pub async fn prosumed(
        &self,
        caller: &Principal,
        period: PeriodId,
        accounts: Vec<Principal>,
        wh_deltas: Vec<i64>,
        wh_price: Amount,
    ) -> LedgerResult<SettlementReport> {
        self.inner
            .lock()
            .await
            .prosumed(caller, period, accounts, wh_deltas, wh_price)
    }

    pub async fn settle(
        &self,
        caller: &Principal,
        batch: &SettlementBatch,
    ) -> LedgerResult<SettlementReport> {
        self.inner.lock().await.settle(caller, batch)
    }

    pub async fn share_price(&self) -> LedgerResult<SharePrice> {
        self.inner.lock().await.share_price()
    }

    pub async fn share_balance(&self, principal: &Principal) -> Shares {
        self.inner.lock().await.share_balance(principal)
    }

    /// Run a read-only closure against a consistent snapshot
    pub async fn inspect<T>(&self, f: impl FnOnce(&CooperativeLedger<R, E>) -> T) -> T {
        let guard = self.inner.lock().await;
        f(&*guard)
    }

    /// Hold the lock across several calls
    pub async fn lock(&self) -> MutexGuard<'_, CooperativeLedger<R, E>> {
        self.inner.lock().await
    }
}

impl<R, E> LedgerHandle<R, E>
where
    R: ReserveAccessor + ExternalAccounts,
    E: EquityLedger,
{
    pub async fn fund(&self, to: &Principal, amount: Amount) {
        self.inner.lock().await.fund(to, amount)
    }

    pub async fn approve(&self, owner: &Principal, amount: Amount) {
        self.inner.lock().await.approve(owner, amount)
    }

    pub async fn revoke(&self, owner: &Principal) {
        self.inner.lock().await.revoke(owner)
    }
}
