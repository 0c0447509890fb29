//! Cooperative Ledger - the single entry point for every operation
//!
//! Composes access control, the member registry, the admission/exit
//! controller and the settlement engine over one reserve accessor and one
//! equity ledger. Mutating operations take `&mut self` and re-check the
//! supply and reserve invariants before returning.
//!
//! The reserve accessor is owned exclusively. Callers get `&R` for reads and
//! the [`ExternalAccounts`] calls for member-side setup; debits and credits
//! happen only inside ledger operations.

use crate::{
    access_control::AccessControl,
    admission::AdmissionController,
    clock::{Clock, SystemClock},
    equity::{EquityLedger, InMemoryEquity},
    pricing,
    reserve::{ExternalAccounts, InMemoryReserve, MeteredReserve, ReserveAccessor},
    settlement_engine::{SettlementBook, SettlementEngine},
};
use chrono::Duration;
use sedao_types::{
    Amount, DaoConfig, DaoSettings, EventJournal, EventRecord, LedgerError, LedgerEvent,
    LedgerResult, MemberRecord, MemberRegistry, MemberState, PeriodId, Principal,
    SettlementBatch, SettlementReport, SharePrice, Shares,
};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Configuration and roles fixed at initialization
#[derive(Clone, Debug)]
struct Setup {
    config: DaoConfig,
    access: AccessControl,
}

/// The cooperative settlement ledger
pub struct CooperativeLedger<R = InMemoryReserve, E = InMemoryEquity> {
    reserve: MeteredReserve<R>,
    equity: E,
    clock: Arc<dyn Clock>,
    registry: MemberRegistry,
    journal: EventJournal,
    settlement: SettlementBook,
    setup: Option<Setup>,
}

impl<R, E> CooperativeLedger<R, E>
where
    R: ReserveAccessor,
    E: EquityLedger,
{
    /// Create an uninitialized ledger on the wall clock
    pub fn new(reserve: R, equity: E) -> Self {
        Self::with_clock(reserve, equity, Arc::new(SystemClock))
    }

    /// Create an uninitialized ledger with an explicit clock
    pub fn with_clock(reserve: R, equity: E, clock: Arc<dyn Clock>) -> Self {
        Self {
            reserve: MeteredReserve::new(reserve),
            equity,
            clock,
            registry: MemberRegistry::new(),
            journal: EventJournal::new(),
            settlement: SettlementBook::new(),
            setup: None,
        }
    }

    /// Fix the configuration; `caller` becomes the admin. Only once.
    pub fn initialize(&mut self, caller: &Principal, settings: DaoSettings) -> LedgerResult<()> {
        if self.setup.is_some() {
            return Err(LedgerError::AlreadyInitialized);
        }
        if settings.payment_asset != self.reserve.asset() {
            return Err(LedgerError::InvalidConfig(format!(
                "payment asset {} does not match reserve asset {}",
                settings.payment_asset,
                self.reserve.asset()
            )));
        }
        let config = DaoConfig::from_settings(settings)?;

        info!(
            admin = %caller,
            payment_asset = %config.payment_asset,
            admission_amount = config.admission_amount.0,
            admission_shares = config.admission_share_amount.0,
            min_shares = config.min_share_amount.0,
            cooldown_secs = config.cooldown_period.num_seconds(),
            "Ledger initialized"
        );
        self.journal.record(
            LedgerEvent::Initialized {
                admin: caller.clone(),
                payment_asset: config.payment_asset.clone(),
                admission_amount: config.admission_amount,
            },
            self.clock.now(),
        );
        self.setup = Some(Setup {
            config,
            access: AccessControl::new(caller.clone()),
        });
        Ok(())
    }

    // =========================================================================
    // ACCESS CONTROL
    // =========================================================================

    /// Authorize `oracle` to submit settlement batches (admin-only, idempotent)
    pub fn add_oracle(&mut self, caller: &Principal, oracle: Principal) -> LedgerResult<()> {
        let now = self.clock.now();
        let setup = self.setup.as_mut().ok_or(LedgerError::NotInitialized)?;
        if setup.access.add_oracle(caller, oracle.clone())? {
            self.journal.record(LedgerEvent::OracleAdded { oracle }, now);
        }
        Ok(())
    }

    pub fn is_oracle(&self, principal: &Principal) -> bool {
        self.setup
            .as_ref()
            .map(|s| s.access.is_oracle(principal))
            .unwrap_or(false)
    }

    // =========================================================================
    // MEMBERSHIP OPERATIONS
    // =========================================================================

    pub fn join(&mut self, caller: &Principal) -> LedgerResult<Shares> {
        let result = self.admission()?.join(caller);
        self.after_mutation(result)
    }

    pub fn buy_shares(&mut self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        let result = self.admission()?.buy_shares(caller, amount);
        self.after_mutation(result)
    }

    pub fn redeem_shares(&mut self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        let result = self.admission()?.redeem_shares(caller, amount);
        self.after_mutation(result)
    }

    pub fn leave(&mut self, caller: &Principal) -> LedgerResult<Shares> {
        let result = self.admission()?.leave(caller);
        self.after_mutation(result)
    }

    /// Admin override: force `member` back to `NonMember`
    pub fn remove_member(&mut self, caller: &Principal, member: &Principal) -> LedgerResult<Shares> {
        self.setup()?.access.require_admin(caller)?;
        let result = self.admission()?.remove_member(member);
        self.after_mutation(result)
    }

    /// Shares cannot change hands
    pub fn transfer_shares(
        &mut self,
        caller: &Principal,
        to: &Principal,
        amount: Shares,
    ) -> LedgerResult<()> {
        self.setup()?;
        self.equity.transfer(caller, to, amount)
    }

    // =========================================================================
    // SETTLEMENT
    // =========================================================================

    /// Settle one period of metered production/consumption (oracle-only)
    pub fn prosumed(
        &mut self,
        caller: &Principal,
        period: PeriodId,
        accounts: Vec<Principal>,
        wh_deltas: Vec<i64>,
        wh_price: Amount,
    ) -> LedgerResult<SettlementReport> {
        self.settle(caller, &SettlementBatch::new(period, accounts, wh_deltas, wh_price))
    }

    /// Settle a prepared batch (oracle-only)
    pub fn settle(
        &mut self,
        caller: &Principal,
        batch: &SettlementBatch,
    ) -> LedgerResult<SettlementReport> {
        let now = self.clock.now();
        let setup = self.setup.as_ref().ok_or(LedgerError::NotInitialized)?;
        setup.access.require_oracle(caller)?;

        let result = SettlementEngine {
            policy: setup.config.settlement,
            registry: &self.registry,
            reserve: &mut self.reserve,
            equity: &mut self.equity,
            journal: &mut self.journal,
            book: &mut self.settlement,
            now,
        }
        .settle(batch);
        self.after_mutation(result)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub fn is_initialized(&self) -> bool {
        self.setup.is_some()
    }

    pub fn config(&self) -> LedgerResult<&DaoConfig> {
        Ok(&self.setup()?.config)
    }

    pub fn admin(&self) -> LedgerResult<&Principal> {
        Ok(self.setup()?.access.admin())
    }

    pub fn payment_asset(&self) -> LedgerResult<&str> {
        Ok(&self.setup()?.config.payment_asset)
    }

    pub fn admission_amount(&self) -> LedgerResult<Amount> {
        Ok(self.setup()?.config.admission_amount)
    }

    pub fn admission_share_amount(&self) -> LedgerResult<Shares> {
        Ok(self.setup()?.config.admission_share_amount)
    }

    pub fn min_share_amount(&self) -> LedgerResult<Shares> {
        Ok(self.setup()?.config.min_share_amount)
    }

    pub fn cooldown_period(&self) -> LedgerResult<Duration> {
        Ok(self.setup()?.config.cooldown_period)
    }

    /// Active or Left
    pub fn is_member(&self, principal: &Principal) -> bool {
        self.registry.is_member(principal)
    }

    pub fn member_state(&self, principal: &Principal) -> MemberState {
        self.registry.state_of(principal)
    }

    pub fn member(&self, principal: &Principal) -> Option<&MemberRecord> {
        self.registry.get(principal)
    }

    pub fn members(&self) -> &MemberRegistry {
        &self.registry
    }

    pub fn share_price(&self) -> LedgerResult<SharePrice> {
        pricing::share_price(&self.reserve, &self.equity)
    }

    pub fn share_balance(&self, principal: &Principal) -> Shares {
        self.equity.balance_of(principal)
    }

    pub fn total_supply(&self) -> Shares {
        self.equity.total_supply()
    }

    pub fn reserve_balance(&self) -> Amount {
        self.reserve.reserve_balance()
    }

    /// Payment-asset balance of any principal
    pub fn payment_balance(&self, principal: &Principal) -> Amount {
        self.reserve.balance_of(principal)
    }

    pub fn arrears(&self, member: &Principal) -> Amount {
        self.settlement.arrears(member)
    }

    pub fn outstanding_claims(&self, member: &Principal) -> Amount {
        self.settlement.unpaid_claims(member)
    }

    pub fn settlement_book(&self) -> &SettlementBook {
        &self.settlement
    }

    pub fn events(&self) -> &[EventRecord] {
        self.journal.records()
    }

    pub fn journal(&self) -> &EventJournal {
        &self.journal
    }

    /// Read-only view of the equity ledger
    pub fn equity(&self) -> &E {
        &self.equity
    }

    /// Read-only view of the payment-asset ledger
    pub fn reserve(&self) -> &R {
        self.reserve.inner()
    }

    // =========================================================================
    // INVARIANTS
    // =========================================================================

    /// Recompute the supply and reserve invariants
    pub fn verify_invariants(&self) -> LedgerResult<()> {
        let reserve = self.reserve.reserve_balance();
        match self.reserve.expected_balance() {
            Some(expected) if expected == reserve => {}
            Some(expected) => {
                return Err(LedgerError::InvariantViolation(format!(
                    "reserve holds {} but ledger operations account for {}",
                    reserve, expected
                )));
            }
            None => {
                return Err(LedgerError::InvariantViolation(format!(
                    "reserve holds {} but ledger outflows exceed inflows",
                    reserve
                )));
            }
        }

        let supply = self.equity.total_supply();
        let held = self
            .registry
            .principals()
            .try_fold(Shares::zero(), |acc, p| acc.checked_add(self.equity.balance_of(p)))?;
        if held != supply {
            return Err(LedgerError::InvariantViolation(format!(
                "total supply {} differs from member holdings {}",
                supply, held
            )));
        }

        if let Some((holder, _)) = self
            .equity
            .holders()
            .into_iter()
            .find(|(p, _)| self.registry.get(p).is_none())
        {
            return Err(LedgerError::InvariantViolation(format!(
                "{} holds shares but was never admitted",
                holder
            )));
        }

        Ok(())
    }

    fn setup(&self) -> LedgerResult<&Setup> {
        self.setup.as_ref().ok_or(LedgerError::NotInitialized)
    }

    fn admission(&mut self) -> LedgerResult<AdmissionController<'_, MeteredReserve<R>, E>> {
        let now = self.clock.now();
        let setup = self.setup.as_ref().ok_or(LedgerError::NotInitialized)?;
        Ok(AdmissionController {
            config: &setup.config,
            registry: &mut self.registry,
            reserve: &mut self.reserve,
            equity: &mut self.equity,
            journal: &mut self.journal,
            now,
        })
    }

    fn after_mutation<T>(&self, result: LedgerResult<T>) -> LedgerResult<T> {
        if let Err(violation) = self.verify_invariants() {
            error!(error = %violation, "Ledger invariant violated");
            debug_assert!(false, "{}", violation);
        }
        if let Err(e) = &result {
            debug!(error = %e, "Operation rejected");
        }
        result
    }
}

// =============================================================================
// MEMBER-SIDE ACCOUNTS
// =============================================================================

impl<R, E> CooperativeLedger<R, E>
where
    R: ReserveAccessor + ExternalAccounts,
    E: EquityLedger,
{
    /// Issue payment-asset units to a principal's own account
    pub fn fund(&mut self, to: &Principal, amount: Amount) {
        self.reserve.fund(to, amount);
    }

    /// Set the allowance `owner` grants the ledger
    pub fn approve(&mut self, owner: &Principal, amount: Amount) {
        self.reserve.approve(owner, amount);
    }

    /// Withdraw `owner`'s allowance entirely
    pub fn revoke(&mut self, owner: &Principal) {
        self.reserve.revoke(owner);
    }
}
