//! Payment amounts, share units and the share price
//!
//! Payment-asset balances and share balances are tracked in base units.
//! They are deliberately separate types: the only bridge between them is
//! a `SharePrice`, which rounds every conversion in favor of the reserve.

use crate::{LedgerError, LedgerResult};
use serde::{Deserialize, Serialize};

/// Payment-asset amount in base units
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Amount(pub u128);

impl Amount {
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> LedgerResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn checked_sub(self, other: Self) -> LedgerResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Multiply by an integer factor (e.g. a per-unit price times a quantity)
    pub fn checked_mul(self, factor: u128) -> LedgerResult<Self> {
        self.0
            .checked_mul(factor)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    /// Parse a decimal string such as `"0.2"` or `"250"` into base units
    pub fn parse_units(value: &str, decimals: u32) -> LedgerResult<Self> {
        parse_units(value, decimals).map(Self)
    }

    /// Render base units as a decimal string with `decimals` places
    pub fn format_units(&self, decimals: u32) -> String {
        format_units(self.0, decimals)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Share units (the cooperative's non-transferable equity)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Shares(pub u128);

impl Shares {
    pub fn new(value: u128) -> Self {
        Self(value)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> LedgerResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn checked_sub(self, other: Self) -> LedgerResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Self)
            .ok_or(LedgerError::ArithmeticOverflow)
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Shares {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}sh", self.0)
    }
}

/// Net asset value per share, kept as an exact ratio `reserve / supply`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharePrice {
    /// Reserve balance backing the shares
    pub reserve: Amount,
    /// Total share supply (never zero)
    pub supply: Shares,
}

impl SharePrice {
    /// Build a price; fails with `ZeroSupply` when there are no shares
    pub fn new(reserve: Amount, supply: Shares) -> LedgerResult<Self> {
        if supply.is_zero() {
            return Err(LedgerError::ZeroSupply);
        }
        Ok(Self { reserve, supply })
    }

    /// Whether a share currently carries no value at all
    pub fn is_worthless(&self) -> bool {
        self.reserve.is_zero()
    }

    /// Payout for `shares`, rounded down
    pub fn value_of(&self, shares: Shares) -> LedgerResult<Amount> {
        mul_div_floor(shares.0, self.reserve.0, self.supply.0).map(Amount)
    }

    /// Purchase cost for `shares`, rounded up
    pub fn cost_of(&self, shares: Shares) -> LedgerResult<Amount> {
        mul_div_ceil(shares.0, self.reserve.0, self.supply.0).map(Amount)
    }

    /// Smallest number of shares worth at least `amount`
    pub fn shares_covering(&self, amount: Amount) -> LedgerResult<Shares> {
        if self.reserve.is_zero() {
            return Err(LedgerError::ZeroSupply);
        }
        mul_div_ceil(amount.0, self.supply.0, self.reserve.0).map(Shares)
    }

    /// Approximate price for display and logs
    pub fn as_f64(&self) -> f64 {
        self.reserve.0 as f64 / self.supply.0 as f64
    }
}

impl std::fmt::Display for SharePrice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.reserve.0, self.supply.0)
    }
}

fn mul_div_floor(a: u128, b: u128, d: u128) -> LedgerResult<u128> {
    let product = a.checked_mul(b).ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(product / d)
}

fn mul_div_ceil(a: u128, b: u128, d: u128) -> LedgerResult<u128> {
    let product = a.checked_mul(b).ok_or(LedgerError::ArithmeticOverflow)?;
    Ok(product.div_ceil(d))
}

fn parse_units(value: &str, decimals: u32) -> LedgerResult<u128> {
    let value = value.trim();
    let invalid = || LedgerError::InvalidConfig(format!("not a decimal amount: {:?}", value));

    let (whole, fraction) = match value.split_once('.') {
        Some((w, f)) => (w, f),
        None => (value, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > decimals as usize {
        return Err(LedgerError::InvalidConfig(format!(
            "{:?} has more than {} decimal places",
            value, decimals
        )));
    }

    let scale = 10u128
        .checked_pow(decimals)
        .ok_or(LedgerError::ArithmeticOverflow)?;
    let whole: u128 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| invalid())?
    };
    let padded = format!("{:0<width$}", fraction, width = decimals as usize);
    let fraction: u128 = if padded.is_empty() {
        0
    } else {
        padded.parse().map_err(|_| invalid())?
    };

    whole
        .checked_mul(scale)
        .and_then(|w| w.checked_add(fraction))
        .ok_or(LedgerError::ArithmeticOverflow)
}

fn format_units(value: u128, decimals: u32) -> String {
    if decimals == 0 {
        return value.to_string();
    }
    let scale = 10u128.pow(decimals);
    let fraction = format!("{:0>width$}", value % scale, width = decimals as usize);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{}", value / scale)
    } else {
        format!("{}.{}", value / scale, fraction)
    }
}
