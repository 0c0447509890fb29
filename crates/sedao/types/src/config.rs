//! DAO configuration
//!
//! `DaoSettings` is the initialization surface (what an operator provides).
//! `DaoConfig` is the validated, immutable configuration the ledger runs
//! with, including the derived admission and floor share amounts.

use crate::{Amount, LedgerError, LedgerResult, Shares};
use chrono::Duration;
use serde::{Deserialize, Serialize};

/// A non-negative fraction `numerator / denominator`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fraction {
    pub numerator: u128,
    pub denominator: u128,
}

impl Fraction {
    pub fn new(numerator: u128, denominator: u128) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn half() -> Self {
        Self::new(1, 2)
    }

    /// Apply the fraction to `value`, rounding down
    pub fn apply(&self, value: u128) -> LedgerResult<u128> {
        value
            .checked_mul(self.numerator)
            .map(|v| v / self.denominator)
            .ok_or(LedgerError::ArithmeticOverflow)
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Self::half()
    }
}

/// What to do with batch entries for principals that are not members
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NonMemberPolicy {
    /// Fail the whole batch before anything moves
    #[default]
    Reject,
    /// Leave the entry untouched and report it as skipped
    Skip,
}

/// What to do when a period is submitted more than once
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePeriodPolicy {
    /// Settle it again; the caller owns idempotence
    #[default]
    Allow,
    /// Fail the batch as malformed
    Reject,
}

/// Validation applied to settlement batches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SettlementPolicy {
    #[serde(default)]
    pub non_member_accounts: NonMemberPolicy,
    #[serde(default)]
    pub duplicate_periods: DuplicatePeriodPolicy,
}

/// Initialization settings for a ledger instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaoSettings {
    /// Reference to the payment asset the reserve is held in
    pub payment_asset: String,
    /// Payment required to join
    pub admission_amount: Amount,
    /// Shares minted per admission payment unit
    #[serde(default = "default_share_ratio")]
    pub share_ratio: u128,
    /// Floor as a fraction of the admission share amount
    #[serde(default)]
    pub min_share_fraction: Fraction,
    /// Cooldown after leaving, in seconds
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    /// Settlement batch validation
    #[serde(default)]
    pub settlement: SettlementPolicy,
}

impl DaoSettings {
    pub fn new(payment_asset: impl Into<String>, admission_amount: Amount) -> Self {
        Self {
            payment_asset: payment_asset.into(),
            admission_amount,
            share_ratio: default_share_ratio(),
            min_share_fraction: Fraction::half(),
            cooldown_secs: default_cooldown_secs(),
            settlement: SettlementPolicy::default(),
        }
    }

    pub fn with_share_ratio(mut self, ratio: u128) -> Self {
        self.share_ratio = ratio;
        self
    }

    pub fn with_min_share_fraction(mut self, fraction: Fraction) -> Self {
        self.min_share_fraction = fraction;
        self
    }

    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    pub fn with_settlement_policy(mut self, policy: SettlementPolicy) -> Self {
        self.settlement = policy;
        self
    }
}

fn default_share_ratio() -> u128 {
    1
}

fn default_cooldown_secs() -> u64 {
    24 * 60 * 60
}

/// Longest accepted cooldown: one hundred years
pub const MAX_COOLDOWN_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Validated, immutable configuration
#[derive(Clone, Debug)]
pub struct DaoConfig {
    pub payment_asset: String,
    pub admission_amount: Amount,
    pub share_ratio: u128,
    pub min_share_fraction: Fraction,
    pub cooldown_period: Duration,
    pub settlement: SettlementPolicy,
    /// Shares minted on admission
    pub admission_share_amount: Shares,
    /// Absolute floor every active (or cooling-down) member must keep
    pub min_share_amount: Shares,
}

impl DaoConfig {
    /// Validate settings and derive the share amounts
    pub fn from_settings(settings: DaoSettings) -> LedgerResult<Self> {
        if settings.payment_asset.trim().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "payment asset reference is empty".into(),
            ));
        }
        if settings.admission_amount.is_zero() {
            return Err(LedgerError::InvalidConfig(
                "admission amount must be positive".into(),
            ));
        }
        if settings.share_ratio == 0 {
            return Err(LedgerError::InvalidConfig(
                "share ratio must be positive".into(),
            ));
        }
        let fraction = settings.min_share_fraction;
        if fraction.denominator == 0 || fraction.numerator > fraction.denominator {
            return Err(LedgerError::InvalidConfig(format!(
                "floor fraction {}/{} must lie within [0, 1]",
                fraction.numerator, fraction.denominator
            )));
        }
        if settings.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(LedgerError::InvalidConfig(format!(
                "cooldown of {}s exceeds the maximum of {}s",
                settings.cooldown_secs, MAX_COOLDOWN_SECS
            )));
        }
        let cooldown_period = i64::try_from(settings.cooldown_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| LedgerError::InvalidConfig("cooldown too long".into()))?;

        let admission_share_amount = Shares(
            settings
                .admission_amount
                .0
                .checked_mul(settings.share_ratio)
                .ok_or(LedgerError::ArithmeticOverflow)?,
        );
        let min_share_amount = Shares(fraction.apply(admission_share_amount.0)?);

        Ok(Self {
            payment_asset: settings.payment_asset,
            admission_amount: settings.admission_amount,
            share_ratio: settings.share_ratio,
            min_share_fraction: fraction,
            cooldown_period,
            settlement: settings.settlement,
            admission_share_amount,
            min_share_amount,
        })
    }
}
