//! Settlement batch types
//!
//! A batch carries one period's metered energy deltas for a set of
//! accounts (positive = net production, negative = net consumption) and
//! the unit price. The report describes what happened to each entry.

use crate::{Amount, LedgerError, LedgerResult, PeriodId, Principal, Shares};
use serde::{Deserialize, Serialize};

/// An oracle-submitted settlement batch
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBatch {
    pub period: PeriodId,
    pub accounts: Vec<Principal>,
    /// Signed energy deltas in whole metering units (Wh)
    pub wh_deltas: Vec<i64>,
    /// Price per metering unit
    pub wh_price: Amount,
}

impl SettlementBatch {
    pub fn new(
        period: PeriodId,
        accounts: Vec<Principal>,
        wh_deltas: Vec<i64>,
        wh_price: Amount,
    ) -> Self {
        Self {
            period,
            accounts,
            wh_deltas,
            wh_price,
        }
    }

    /// Check shape and compute each entry's payment
    pub fn entries(&self) -> LedgerResult<Vec<SettlementEntry>> {
        if self.accounts.len() != self.wh_deltas.len() {
            return Err(LedgerError::MalformedBatch(format!(
                "{} accounts but {} deltas",
                self.accounts.len(),
                self.wh_deltas.len()
            )));
        }

        self.accounts
            .iter()
            .zip(&self.wh_deltas)
            .map(|(account, &wh_delta)| {
                let energy = wh_delta.unsigned_abs();
                let payment = self.wh_price.checked_mul(energy as u128).map_err(|_| {
                    LedgerError::MalformedBatch(format!(
                        "payment for {} Wh at {} overflows",
                        energy, self.wh_price
                    ))
                })?;
                let direction = match wh_delta.signum() {
                    1 if !payment.is_zero() => Direction::Produced,
                    -1 if !payment.is_zero() => Direction::Consumed,
                    _ => Direction::Idle,
                };
                Ok(SettlementEntry {
                    account: account.clone(),
                    energy,
                    payment,
                    direction,
                })
            })
            .collect()
    }

    /// Sum of signed payments; `Some(0)` for a well-formed batch
    pub fn net_payment(&self) -> Option<i128> {
        let price = i128::try_from(self.wh_price.0).ok()?;
        self.wh_deltas
            .iter()
            .try_fold(0i128, |acc, &d| acc.checked_add((d as i128).checked_mul(price)?))
    }
}

/// Which way value flows for one entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Produced,
    Consumed,
    Idle,
}

/// One validated batch entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettlementEntry {
    pub account: Principal,
    /// Absolute energy in metering units
    pub energy: u64,
    /// Absolute payment (`wh_price × energy`)
    pub payment: Amount,
    pub direction: Direction,
}

/// What happened to one batch entry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccountOutcome {
    /// Producer credited in full
    Produced { account: Principal, credited: Amount },
    /// Consumer debited in full
    Consumed { account: Principal, debited: Amount },
    /// Consumer could not pay; shares were seized instead
    Defaulted {
        account: Principal,
        shortfall: Amount,
        shares_burned: Shares,
        unrecovered: Amount,
        reason: String,
    },
    /// The reserve could not cover a producer's credit
    Unpaid { account: Principal, owed: Amount },
    /// Zero delta (or zero price): nothing moved
    Idle { account: Principal },
    /// Non-member skipped under the `Skip` policy
    Skipped { account: Principal },
}

impl AccountOutcome {
    pub fn account(&self) -> &Principal {
        match self {
            AccountOutcome::Produced { account, .. }
            | AccountOutcome::Consumed { account, .. }
            | AccountOutcome::Defaulted { account, .. }
            | AccountOutcome::Unpaid { account, .. }
            | AccountOutcome::Idle { account }
            | AccountOutcome::Skipped { account } => account,
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, AccountOutcome::Defaulted { .. })
    }
}

/// Result of settling one batch
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SettlementReport {
    pub period: PeriodId,
    /// One outcome per batch index, in input order
    pub outcomes: Vec<AccountOutcome>,
    pub total_credited: Amount,
    pub total_debited: Amount,
    pub total_seized_shares: Shares,
    pub total_unrecovered: Amount,
}

impl SettlementReport {
    pub fn new(period: PeriodId) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    pub fn defaults(&self) -> impl Iterator<Item = &AccountOutcome> {
        self.outcomes.iter().filter(|o| o.is_default())
    }

    pub fn outcome_for(&self, account: &Principal) -> Option<&AccountOutcome> {
        self.outcomes.iter().find(|o| o.account() == account)
    }
}
