//! Admission & Exit Controller - join, buy, redeem, leave, remove
//!
//! Every operation checks all of its preconditions before touching the
//! reserve or the equity ledger, and undoes its first external effect if
//! the second one fails. A failed call leaves no trace.

use crate::{equity::EquityLedger, pricing::share_price, reserve::ReserveAccessor};
use chrono::{DateTime, Utc};
use sedao_types::{
    Amount, DaoConfig, EventJournal, LedgerError, LedgerEvent, LedgerResult, MemberRegistry,
    MemberState, Principal, Shares,
};
use tracing::{error, info, warn};

/// Member-facing lifecycle operations over borrowed ledger state
pub struct AdmissionController<'a, R: ?Sized, E: ?Sized> {
    pub(crate) config: &'a DaoConfig,
    pub(crate) registry: &'a mut MemberRegistry,
    pub(crate) reserve: &'a mut R,
    pub(crate) equity: &'a mut E,
    pub(crate) journal: &'a mut EventJournal,
    pub(crate) now: DateTime<Utc>,
}

impl<'a, R, E> AdmissionController<'a, R, E>
where
    R: ReserveAccessor + ?Sized,
    E: EquityLedger + ?Sized,
{
    /// Admit `caller` against the admission payment
    pub fn join(&mut self, caller: &Principal) -> LedgerResult<Shares> {
        if self.registry.state_of(caller) != MemberState::NonMember {
            warn!(caller = %caller, "Rejected join: already a member");
            return Err(LedgerError::AlreadyMember(caller.clone()));
        }

        let amount_paid = self.config.admission_amount;
        let shares_issued = self.config.admission_share_amount;

        self.reserve.debit(caller, amount_paid).map_err(|e| {
            warn!(caller = %caller, error = %e, "Admission payment rejected");
            LedgerError::from(e)
        })?;
        if let Err(e) = self.equity.mint(caller, shares_issued) {
            self.refund(caller, amount_paid);
            return Err(e);
        }
        self.registry.admit(caller.clone(), self.now);

        info!(
            member = %caller,
            amount_paid = amount_paid.0,
            shares_issued = shares_issued.0,
            "Member joined"
        );
        self.journal.record(
            LedgerEvent::Joined {
                member: caller.clone(),
                amount_paid,
                shares_issued,
            },
            self.now,
        );

        Ok(shares_issued)
    }

    /// Buy `amount` additional shares at the current price (rounded up)
    pub fn buy_shares(&mut self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        if !self.registry.is_active(caller) {
            warn!(caller = %caller, "Rejected buy: not a member");
            return Err(LedgerError::NotAMember(caller.clone()));
        }

        let price = share_price(&*self.reserve, &*self.equity)?;
        if price.is_worthless() {
            warn!(caller = %caller, supply = price.supply.0, "Rejected buy: reserve is empty");
            return Err(LedgerError::WorthlessShares {
                supply: price.supply,
            });
        }
        let cost = price.cost_of(amount)?;

        self.reserve.debit(caller, cost)?;
        if let Err(e) = self.equity.mint(caller, amount) {
            self.refund(caller, cost);
            return Err(e);
        }

        info!(member = %caller, shares = amount.0, cost = cost.0, "Shares bought");
        self.journal.record(
            LedgerEvent::BoughtShares {
                member: caller.clone(),
                amount,
                cost,
            },
            self.now,
        );

        Ok(cost)
    }

    /// Redeem `amount` shares for their value at the pre-redemption price
    pub fn redeem_shares(&mut self, caller: &Principal, amount: Shares) -> LedgerResult<Amount> {
        let balance = self.equity.balance_of(caller);
        let state = match self.registry.get(caller) {
            None => None,
            Some(record) if record.state == MemberState::NonMember && balance.is_zero() => None,
            Some(record) => Some(record),
        };
        let Some(record) = state else {
            warn!(caller = %caller, "Rejected redeem: not a member");
            return Err(LedgerError::NotAMember(caller.clone()));
        };

        if amount > balance {
            return Err(LedgerError::ExceedsBalance {
                requested: amount,
                balance,
            });
        }
        let remaining = balance.saturating_sub(amount);
        let floor = self.config.min_share_amount;

        match record.state {
            MemberState::Active if remaining < floor => {
                return Err(LedgerError::BelowFloor { remaining, floor });
            }
            MemberState::Left if !record.cooldown_elapsed(self.config.cooldown_period, self.now) => {
                if remaining < floor {
                    let ends_at = record
                        .cooldown_ends_at(self.config.cooldown_period)
                        .unwrap_or(DateTime::<Utc>::MAX_UTC);
                    return Err(LedgerError::CooldownNotElapsed {
                        remaining,
                        floor,
                        ends_at,
                    });
                }
            }
            // Cooldown elapsed, or removed by the admin: no floor
            _ => {}
        }

        // Price is read once, before supply changes
        let price = share_price(&*self.reserve, &*self.equity)?;
        let payout = price.value_of(amount)?;

        self.equity.burn(caller, amount)?;
        if let Err(e) = self.reserve.credit(caller, payout) {
            if let Err(restore) = self.equity.mint(caller, amount) {
                error!(member = %caller, error = %restore, "Failed to restore burned shares");
            }
            return Err(e.into());
        }

        info!(
            member = %caller,
            shares = amount.0,
            payout = payout.0,
            remaining = remaining.0,
            "Shares redeemed"
        );
        self.journal.record(
            LedgerEvent::RedeemedShares {
                member: caller.clone(),
                amount,
                payout,
            },
            self.now,
        );

        Ok(payout)
    }

    /// Start the exit cooldown; balance and price are untouched
    pub fn leave(&mut self, caller: &Principal) -> LedgerResult<Shares> {
        if !self.registry.is_active(caller) {
            warn!(caller = %caller, "Rejected leave: not a member");
            return Err(LedgerError::NotAMember(caller.clone()));
        }

        self.registry.mark_left(caller, self.now);
        let balance_at_leave = self.equity.balance_of(caller);

        info!(
            member = %caller,
            balance = balance_at_leave.0,
            cooldown_secs = self.config.cooldown_period.num_seconds(),
            "Member left"
        );
        self.journal.record(
            LedgerEvent::Left {
                member: caller.clone(),
                balance_at_leave,
            },
            self.now,
        );

        Ok(balance_at_leave)
    }

    /// Administrative override back to `NonMember` (caller already checked)
    pub fn remove_member(&mut self, member: &Principal) -> LedgerResult<Shares> {
        if !self.registry.is_member(member) {
            return Err(LedgerError::NotAMember(member.clone()));
        }

        self.registry.mark_removed(member);
        let balance = self.equity.balance_of(member);

        warn!(member = %member, balance = balance.0, "Member removed by admin");
        self.journal.record(
            LedgerEvent::MemberRemoved {
                member: member.clone(),
                balance,
            },
            self.now,
        );

        Ok(balance)
    }

    fn refund(&mut self, to: &Principal, amount: Amount) {
        if let Err(e) = self.reserve.credit(to, amount) {
            error!(member = %to, amount = amount.0, error = %e, "Failed to refund payment");
        }
    }
}
