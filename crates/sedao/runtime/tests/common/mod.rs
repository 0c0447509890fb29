//! Shared fixtures for ledger integration tests

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use sedao_runtime::{CooperativeLedger, InMemoryEquity, InMemoryReserve, ManualClock};
use sedao_types::{Amount, DaoSettings, Principal, Shares};
use std::sync::Arc;

pub const ASSET: &str = "payment-token";
pub const DECIMALS: u32 = 6;

/// Whole payment units in base units
pub fn units(whole: u128) -> Amount {
    Amount::new(whole * 10u128.pow(DECIMALS))
}

pub fn shares(whole: u128) -> Shares {
    Shares::new(whole * 10u128.pow(DECIMALS))
}

pub fn admission_amount() -> Amount {
    units(100)
}

pub fn admin() -> Principal {
    Principal::new("admin")
}

pub fn oracle() -> Principal {
    Principal::new("oracle-1")
}

pub fn eve() -> Principal {
    Principal::new("eve")
}

pub fn members() -> Vec<Principal> {
    (1..=4).map(|i| Principal::new(format!("member-{}", i))).collect()
}

pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub struct Fixture {
    pub ledger: CooperativeLedger,
    pub clock: ManualClock,
}

/// Initialized ledger; every member (and eve) holds 10x the admission amount
pub fn setup() -> Fixture {
    setup_with(DaoSettings::new(ASSET, admission_amount()))
}

pub fn setup_with(settings: DaoSettings) -> Fixture {
    let clock = ManualClock::new(start_time());
    let mut reserve = InMemoryReserve::new(ASSET);
    for m in members().iter().chain([eve()].iter()) {
        reserve.fund(m, units(1_000));
    }

    let mut ledger =
        CooperativeLedger::with_clock(reserve, InMemoryEquity::new(), Arc::new(clock.clone()));
    ledger.initialize(&admin(), settings).unwrap();
    Fixture { ledger, clock }
}

/// `setup()` plus an oracle and all four members joined with generous approvals
pub fn setup_joined() -> Fixture {
    let mut fx = setup();
    fx.ledger.add_oracle(&admin(), oracle()).unwrap();
    for m in members() {
        fx.ledger.approve(&m, units(1_000_000));
        fx.ledger.join(&m).unwrap();
    }
    fx
}
