//! Settlement Engine - batched peer-to-peer energy settlement
//!
//! A batch is validated as a whole, then settled per account. Consumers
//! are debited first so the pool is funded by the batch itself, then
//! producers are credited. A consumer whose debit fails does not abort
//! the batch: producers are still paid from the reserve and the shortfall
//! is recovered by burning the defaulter's shares at the price snapshot
//! taken before any transfer.

use crate::{equity::EquityLedger, pricing::share_price, reserve::ReserveAccessor};
use chrono::{DateTime, Utc};
use sedao_types::{
    AccountOutcome, Amount, Direction, DuplicatePeriodPolicy, EventJournal, LedgerError,
    LedgerEvent, LedgerResult, MemberRegistry, NonMemberPolicy, PeriodId, Principal,
    SettlementBatch, SettlementEntry, SettlementPolicy, SettlementReport, SharePrice, Shares,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, error, info, warn};

/// Bookkeeping that outlives individual batches
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettlementBook {
    /// Default debt not covered by seized shares, per member
    arrears: BTreeMap<Principal, Amount>,
    /// Producer credits the reserve could not pay, per member
    unpaid_claims: BTreeMap<Principal, Amount>,
    /// Every period settled so far
    settled_periods: BTreeSet<PeriodId>,
}

impl SettlementBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arrears(&self, member: &Principal) -> Amount {
        self.arrears.get(member).copied().unwrap_or_default()
    }

    pub fn total_arrears(&self) -> Amount {
        self.arrears
            .values()
            .fold(Amount::zero(), |acc, a| acc.saturating_add(*a))
    }

    pub fn unpaid_claims(&self, member: &Principal) -> Amount {
        self.unpaid_claims.get(member).copied().unwrap_or_default()
    }

    pub fn is_settled(&self, period: PeriodId) -> bool {
        self.settled_periods.contains(&period)
    }

    pub fn settled_periods(&self) -> impl Iterator<Item = PeriodId> + '_ {
        self.settled_periods.iter().copied()
    }

    fn add_arrears(&mut self, member: &Principal, amount: Amount) {
        let entry = self.arrears.entry(member.clone()).or_default();
        *entry = entry.saturating_add(amount);
    }

    fn add_unpaid_claim(&mut self, member: &Principal, amount: Amount) {
        let entry = self.unpaid_claims.entry(member.clone()).or_default();
        *entry = entry.saturating_add(amount);
    }
}

/// Settles one batch over borrowed ledger state
pub struct SettlementEngine<'a, R: ?Sized, E: ?Sized> {
    pub(crate) policy: SettlementPolicy,
    pub(crate) registry: &'a MemberRegistry,
    pub(crate) reserve: &'a mut R,
    pub(crate) equity: &'a mut E,
    pub(crate) journal: &'a mut EventJournal,
    pub(crate) book: &'a mut SettlementBook,
    pub(crate) now: DateTime<Utc>,
}

impl<'a, R, E> SettlementEngine<'a, R, E>
where
    R: ReserveAccessor + ?Sized,
    E: EquityLedger + ?Sized,
{
    /// Settle a batch (the caller's oracle role is checked by the ledger)
    pub fn settle(&mut self, batch: &SettlementBatch) -> LedgerResult<SettlementReport> {
        let entries = self.validate(batch)?;
        let period = batch.period;

        if batch.net_payment() != Some(0) {
            warn!(period, "Settlement batch is not balanced; reserve absorbs the difference");
        }

        let price = share_price(&*self.reserve, &*self.equity).ok();
        let mut outcomes: Vec<Option<AccountOutcome>> = vec![None; entries.len()];
        let mut report = SettlementReport::new(period);

        for (i, entry) in entries.iter().enumerate() {
            let Some(entry) = entry else {
                outcomes[i] = Some(AccountOutcome::Skipped {
                    account: batch.accounts[i].clone(),
                });
                continue;
            };
            if entry.direction != Direction::Consumed {
                continue;
            }
            let outcome = self.collect(entry, period, batch.wh_price, price.as_ref());
            match &outcome {
                AccountOutcome::Consumed { debited, .. } => {
                    report.total_debited = report.total_debited.saturating_add(*debited);
                }
                AccountOutcome::Defaulted {
                    shares_burned,
                    unrecovered,
                    ..
                } => {
                    report.total_seized_shares = Shares(
                        report.total_seized_shares.0.saturating_add(shares_burned.0),
                    );
                    report.total_unrecovered = report.total_unrecovered.saturating_add(*unrecovered);
                }
                _ => {}
            }
            outcomes[i] = Some(outcome);
        }

        for (i, entry) in entries.iter().enumerate() {
            let Some(entry) = entry else { continue };
            let outcome = match entry.direction {
                Direction::Produced => {
                    let outcome = self.pay(entry, period, batch.wh_price);
                    if let AccountOutcome::Produced { credited, .. } = &outcome {
                        report.total_credited = report.total_credited.saturating_add(*credited);
                    }
                    outcome
                }
                Direction::Idle => AccountOutcome::Idle {
                    account: entry.account.clone(),
                },
                Direction::Consumed => continue,
            };
            outcomes[i] = Some(outcome);
        }

        report.outcomes = outcomes.into_iter().flatten().collect();
        self.book.settled_periods.insert(period);

        info!(
            period,
            accounts = report.outcomes.len(),
            credited = report.total_credited.0,
            debited = report.total_debited.0,
            defaults = report.defaults().count(),
            "Settlement batch processed"
        );

        Ok(report)
    }

    /// Whole-batch checks; nothing is mutated when these fail.
    /// Entries for skipped non-members come back as `None`.
    fn validate(&self, batch: &SettlementBatch) -> LedgerResult<Vec<Option<SettlementEntry>>> {
        let entries = batch.entries()?;

        if self.policy.duplicate_periods == DuplicatePeriodPolicy::Reject
            && self.book.is_settled(batch.period)
        {
            warn!(period = batch.period, "Rejected batch: period already settled");
            return Err(LedgerError::MalformedBatch(format!(
                "period {} already settled",
                batch.period
            )));
        }

        entries
            .into_iter()
            .map(|entry| {
                if self.registry.is_member(&entry.account) {
                    return Ok(Some(entry));
                }
                match self.policy.non_member_accounts {
                    NonMemberPolicy::Reject => {
                        warn!(period = batch.period, account = %entry.account, "Rejected batch: non-member account");
                        Err(LedgerError::NotAMember(entry.account))
                    }
                    NonMemberPolicy::Skip => {
                        debug!(period = batch.period, account = %entry.account, "Skipping non-member account");
                        Ok(None)
                    }
                }
            })
            .collect()
    }

    /// Debit a consumer, falling back to share seizure
    fn collect(
        &mut self,
        entry: &SettlementEntry,
        period: PeriodId,
        wh_price: Amount,
        price: Option<&SharePrice>,
    ) -> AccountOutcome {
        match self.reserve.debit(&entry.account, entry.payment) {
            Ok(()) => {
                debug!(account = %entry.account, period, amount = entry.payment.0, "Consumer debited");
                self.journal.record(
                    LedgerEvent::Consumed {
                        member: entry.account.clone(),
                        period,
                        energy: entry.energy,
                        price: wh_price,
                    },
                    self.now,
                );
                AccountOutcome::Consumed {
                    account: entry.account.clone(),
                    debited: entry.payment,
                }
            }
            Err(reason) => {
                warn!(
                    account = %entry.account,
                    period,
                    amount = entry.payment.0,
                    reason = %reason,
                    "Consumer defaulted"
                );
                self.seize(&entry.account, entry.payment, period, price, reason.to_string())
            }
        }
    }

    /// Burn shares worth `shortfall` (capped at the holding) and record the rest
    fn seize(
        &mut self,
        member: &Principal,
        shortfall: Amount,
        period: PeriodId,
        price: Option<&SharePrice>,
        reason: String,
    ) -> AccountOutcome {
        let balance = self.equity.balance_of(member);

        let (mut shares_burned, mut recovered) = (Shares::zero(), Amount::zero());
        if let Some(price) = price.filter(|p| !p.is_worthless()) {
            let needed = price.shares_covering(shortfall).unwrap_or(balance);
            shares_burned = needed.min(balance);
            recovered = price
                .value_of(shares_burned)
                .unwrap_or(shortfall)
                .min(shortfall);
        }

        if !shares_burned.is_zero() {
            if let Err(e) = self.equity.burn(member, shares_burned) {
                error!(member = %member, error = %e, "Share seizure failed");
                shares_burned = Shares::zero();
                recovered = Amount::zero();
            }
        }

        let unrecovered = shortfall.saturating_sub(recovered);
        if !unrecovered.is_zero() {
            self.book.add_arrears(member, unrecovered);
            warn!(
                member = %member,
                period,
                unrecovered = unrecovered.0,
                "Default not fully covered by shares; recorded as arrears"
            );
        }

        info!(
            member = %member,
            period,
            shortfall = shortfall.0,
            shares_burned = shares_burned.0,
            "Shares seized for default"
        );
        self.journal.record(
            LedgerEvent::SharesSeized {
                member: member.clone(),
                period,
                shortfall,
                shares_burned,
                unrecovered,
            },
            self.now,
        );

        AccountOutcome::Defaulted {
            account: member.clone(),
            shortfall,
            shares_burned,
            unrecovered,
            reason,
        }
    }

    /// Credit a producer from the pool
    fn pay(&mut self, entry: &SettlementEntry, period: PeriodId, wh_price: Amount) -> AccountOutcome {
        match self.reserve.credit(&entry.account, entry.payment) {
            Ok(()) => {
                debug!(account = %entry.account, period, amount = entry.payment.0, "Producer credited");
                self.journal.record(
                    LedgerEvent::Produced {
                        member: entry.account.clone(),
                        period,
                        energy: entry.energy,
                        price: wh_price,
                    },
                    self.now,
                );
                AccountOutcome::Produced {
                    account: entry.account.clone(),
                    credited: entry.payment,
                }
            }
            Err(reason) => {
                error!(
                    account = %entry.account,
                    period,
                    amount = entry.payment.0,
                    reason = %reason,
                    "Reserve cannot cover producer credit"
                );
                self.book.add_unpaid_claim(&entry.account, entry.payment);
                AccountOutcome::Unpaid {
                    account: entry.account.clone(),
                    owed: entry.payment,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{equity::InMemoryEquity, reserve::InMemoryReserve};
    use chrono::Utc;

    struct World {
        registry: MemberRegistry,
        reserve: InMemoryReserve,
        equity: InMemoryEquity,
        journal: EventJournal,
        book: SettlementBook,
    }

    fn world() -> (World, Principal, Principal) {
        let (a, b) = (Principal::new("a"), Principal::new("b"));
        let mut w = World {
            registry: MemberRegistry::new(),
            reserve: InMemoryReserve::new("pt"),
            equity: InMemoryEquity::new(),
            journal: EventJournal::new(),
            book: SettlementBook::new(),
        };
        for p in [&a, &b] {
            w.reserve.fund(p, Amount::new(100));
            w.reserve.approve(p, Amount::new(100));
            w.reserve.debit(p, Amount::new(10)).unwrap();
            w.equity.mint(p, Shares::new(10)).unwrap();
            w.registry.admit(p.clone(), Utc::now());
        }
        (w, a, b)
    }

    fn settle(w: &mut World, batch: &SettlementBatch) -> LedgerResult<SettlementReport> {
        SettlementEngine {
            policy: SettlementPolicy::default(),
            registry: &w.registry,
            reserve: &mut w.reserve,
            equity: &mut w.equity,
            journal: &mut w.journal,
            book: &mut w.book,
            now: Utc::now(),
        }
        .settle(batch)
    }

    #[test]
    fn test_seizure_rounds_up() {
        let (mut w, a, b) = world();
        // Reserve 30 against 20 shares
        w.reserve.fund(&Principal::new("x"), Amount::new(10));
        w.reserve.approve(&Principal::new("x"), Amount::new(10));
        w.reserve.debit(&Principal::new("x"), Amount::new(10)).unwrap();
        w.reserve.revoke(&b);

        let batch = SettlementBatch::new(1, vec![a, b.clone()], vec![4, -4], Amount::new(1));
        let report = settle(&mut w, &batch).unwrap();

        // ceil(4 * 20 / 30) = 3
        assert_eq!(w.equity.balance_of(&b), Shares::new(7));
        assert_eq!(report.total_seized_shares, Shares::new(3));
        assert_eq!(report.total_unrecovered, Amount::zero());
        assert_eq!(w.book.arrears(&b), Amount::zero());
    }

    #[test]
    fn test_book_accumulates() {
        let mut book = SettlementBook::new();
        let m = Principal::new("m");
        book.add_arrears(&m, Amount::new(3));
        book.add_arrears(&m, Amount::new(4));
        book.add_unpaid_claim(&m, Amount::new(5));
        assert_eq!(book.arrears(&m), Amount::new(7));
        assert_eq!(book.total_arrears(), Amount::new(7));
        assert_eq!(book.unpaid_claims(&m), Amount::new(5));
        assert_eq!(book.unpaid_claims(&Principal::new("n")), Amount::zero());
    }

    #[test]
    fn test_validation_failure_mutates_nothing() {
        let (mut w, a, _) = world();
        let batch = SettlementBatch::new(
            1,
            vec![a.clone(), Principal::new("z")],
            vec![-1, 1],
            Amount::new(1),
        );
        assert!(settle(&mut w, &batch).is_err());
        assert_eq!(w.reserve.balance_of(&a), Amount::new(90));
        assert!(w.journal.is_empty());
        assert!(!w.book.is_settled(1));
    }
}
