//! Admission and exit lifecycle through the ledger facade

mod common;

use chrono::Duration;
use common::*;
use sedao_runtime::{CooperativeLedger, InMemoryEquity, InMemoryReserve};
use sedao_types::{DaoSettings, LedgerError, LedgerEvent, MemberState, Shares, MAX_COOLDOWN_SECS};

#[test]
fn test_configuration() {
    let fx = setup();
    let ledger = &fx.ledger;

    assert_eq!(ledger.total_supply(), Shares::zero());
    assert_eq!(ledger.admin().unwrap(), &admin());
    assert_eq!(ledger.payment_asset().unwrap(), ASSET);
    assert_eq!(ledger.admission_amount().unwrap(), units(100));
    assert_eq!(ledger.admission_share_amount().unwrap(), shares(100));
    assert_eq!(ledger.min_share_amount().unwrap(), shares(50));
    assert_eq!(ledger.cooldown_period().unwrap(), Duration::seconds(86_400));
}

#[test]
fn test_initialize_only_once() {
    let mut fx = setup();
    let result = fx
        .ledger
        .initialize(&eve(), DaoSettings::new(ASSET, units(1)));
    assert_eq!(result, Err(LedgerError::AlreadyInitialized));
    assert_eq!(fx.ledger.admin().unwrap(), &admin());
}

#[test]
fn test_operations_before_initialize() {
    let mut ledger = CooperativeLedger::new(InMemoryReserve::new(ASSET), InMemoryEquity::new());
    assert!(!ledger.is_initialized());
    assert_eq!(ledger.join(&eve()), Err(LedgerError::NotInitialized));
    assert_eq!(
        ledger.add_oracle(&admin(), oracle()),
        Err(LedgerError::NotInitialized)
    );
    assert!(ledger.admin().is_err());
}

#[test]
fn test_initialize_rejects_foreign_asset() {
    let mut ledger = CooperativeLedger::new(InMemoryReserve::new(ASSET), InMemoryEquity::new());
    let result = ledger.initialize(&admin(), DaoSettings::new("other-token", units(100)));
    assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
    assert!(!ledger.is_initialized());
}

#[test]
fn test_join_requires_payment() {
    let mut fx = setup();
    let member1 = &members()[0];

    fx.ledger.approve(member1, units(50));
    let result = fx.ledger.join(member1);
    assert!(matches!(
        result,
        Err(LedgerError::InsufficientAllowance { .. })
    ));
    assert!(!fx.ledger.is_member(member1));
    assert_eq!(fx.ledger.share_balance(member1), Shares::zero());
    assert_eq!(fx.ledger.payment_balance(member1), units(1_000));

    fx.ledger.approve(member1, units(100));
    let issued = fx.ledger.join(member1).unwrap();
    assert_eq!(issued, shares(100));
    assert_eq!(
        fx.ledger.journal().last(),
        Some(&LedgerEvent::Joined {
            member: member1.clone(),
            amount_paid: units(100),
            shares_issued: shares(100),
        })
    );
    assert!(fx.ledger.is_member(member1));
    assert_eq!(fx.ledger.member_state(member1), MemberState::Active);
    assert_eq!(fx.ledger.share_balance(member1), shares(100));
    assert_eq!(fx.ledger.reserve_balance(), units(100));

    assert_eq!(
        fx.ledger.join(member1),
        Err(LedgerError::AlreadyMember(member1.clone()))
    );
}

#[test]
fn test_join_insufficient_funds() {
    let mut fx = setup();
    let pauper = sedao_types::Principal::new("pauper");
    fx.ledger.fund(&pauper, units(10));
    fx.ledger.approve(&pauper, units(1_000));

    assert!(matches!(
        fx.ledger.join(&pauper),
        Err(LedgerError::InsufficientFunds { .. })
    ));
    assert_eq!(fx.ledger.total_supply(), Shares::zero());
}

fn joined_member1() -> Fixture {
    let mut fx = setup();
    let member1 = &members()[0];
    fx.ledger.approve(member1, units(1_000_000));
    fx.ledger.join(member1).unwrap();
    fx
}

#[test]
fn test_only_members_buy_shares() {
    let mut fx = joined_member1();
    let member1 = &members()[0];

    let cost = fx.ledger.buy_shares(member1, shares(10)).unwrap();
    assert_eq!(cost, units(10));
    assert_eq!(fx.ledger.share_balance(member1), shares(110));
    assert_eq!(fx.ledger.reserve_balance(), units(110));

    fx.ledger.approve(&eve(), units(1_000_000));
    assert_eq!(
        fx.ledger.buy_shares(&eve(), shares(10)),
        Err(LedgerError::NotAMember(eve()))
    );
}

#[test]
fn test_shares_not_transferable() {
    let mut fx = joined_member1();
    let member1 = &members()[0];
    assert_eq!(
        fx.ledger.transfer_shares(member1, &eve(), Shares::new(1)),
        Err(LedgerError::NonTransferable)
    );
    assert_eq!(fx.ledger.share_balance(&eve()), Shares::zero());
}

#[test]
fn test_redeem_burns_shares() {
    let mut fx = joined_member1();
    let member1 = &members()[0];

    let payout = fx.ledger.redeem_shares(member1, shares(10)).unwrap();
    assert_eq!(payout, units(10));
    assert_eq!(fx.ledger.share_balance(member1), shares(90));
    assert_eq!(fx.ledger.total_supply(), shares(90));
    assert_eq!(fx.ledger.payment_balance(member1), units(910));
}

#[test]
fn test_redeem_respects_floor() {
    let mut fx = joined_member1();
    let member1 = &members()[0];

    let result = fx.ledger.redeem_shares(member1, shares(100));
    assert_eq!(
        result,
        Err(LedgerError::BelowFloor {
            remaining: Shares::zero(),
            floor: shares(50),
        })
    );
    assert_eq!(
        fx.ledger.redeem_shares(member1, shares(51)),
        Err(LedgerError::BelowFloor {
            remaining: shares(49),
            floor: shares(50),
        })
    );
    fx.ledger.redeem_shares(member1, shares(50)).unwrap();
    assert_eq!(fx.ledger.share_balance(member1), shares(50));
}

#[test]
fn test_leave_then_redeem_after_cooldown() {
    let mut fx = joined_member1();
    let member1 = &members()[0];

    assert_eq!(fx.ledger.leave(&eve()), Err(LedgerError::NotAMember(eve())));

    let balance = fx.ledger.leave(member1).unwrap();
    assert_eq!(balance, shares(100));
    assert_eq!(
        fx.ledger.journal().last(),
        Some(&LedgerEvent::Left {
            member: member1.clone(),
            balance_at_leave: shares(100),
        })
    );
    assert_eq!(fx.ledger.member_state(member1), MemberState::Left);
    assert!(fx.ledger.is_member(member1));

    assert!(matches!(
        fx.ledger.redeem_shares(member1, shares(100)),
        Err(LedgerError::CooldownNotElapsed { .. })
    ));
    assert!(matches!(
        fx.ledger.redeem_shares(member1, Shares::new(shares(50).0 + 1)),
        Err(LedgerError::CooldownNotElapsed { .. })
    ));
    fx.ledger.redeem_shares(member1, shares(50)).unwrap();

    let last_price = fx.ledger.share_price().unwrap();
    fx.clock.advance(Duration::seconds(86_400));

    assert_eq!(
        fx.ledger.redeem_shares(member1, shares(100)),
        Err(LedgerError::ExceedsBalance {
            requested: shares(100),
            balance: shares(50),
        })
    );
    let payout = fx.ledger.redeem_shares(member1, shares(50)).unwrap();
    assert_eq!(payout, last_price.value_of(shares(50)).unwrap());
    assert_eq!(fx.ledger.share_balance(member1), Shares::zero());
    assert_eq!(fx.ledger.total_supply(), Shares::zero());
    assert_eq!(fx.ledger.payment_balance(member1), units(1_000));
}

#[test]
fn test_cooldown_boundary() {
    let mut fx = joined_member1();
    let member1 = &members()[0];
    fx.ledger.leave(member1).unwrap();

    fx.clock.advance(Duration::seconds(86_399));
    assert!(matches!(
        fx.ledger.redeem_shares(member1, shares(100)),
        Err(LedgerError::CooldownNotElapsed { .. })
    ));

    fx.clock.advance(Duration::seconds(1));
    fx.ledger.redeem_shares(member1, shares(100)).unwrap();
}

#[test]
fn test_cooldown_beyond_limit_rejected() {
    let mut ledger = CooperativeLedger::new(InMemoryReserve::new(ASSET), InMemoryEquity::new());
    let settings = DaoSettings::new(ASSET, admission_amount()).with_cooldown_secs(10_000_000_000_000);
    assert!(matches!(
        ledger.initialize(&admin(), settings),
        Err(LedgerError::InvalidConfig(_))
    ));
    assert!(!ledger.is_initialized());
}

#[test]
fn test_longest_cooldown_gates_redemption() {
    let mut fx =
        setup_with(DaoSettings::new(ASSET, admission_amount()).with_cooldown_secs(MAX_COOLDOWN_SECS));
    let member1 = &members()[0];
    fx.ledger.approve(member1, units(1_000_000));
    fx.ledger.join(member1).unwrap();
    fx.ledger.leave(member1).unwrap();
    fx.clock.advance(Duration::days(365 * 50));

    fx.ledger.redeem_shares(member1, Shares::new(1)).unwrap();
    assert_eq!(
        fx.ledger.redeem_shares(member1, shares(60)),
        Err(LedgerError::CooldownNotElapsed {
            remaining: Shares::new(shares(40).0 - 1),
            floor: shares(50),
            ends_at: start_time() + Duration::days(36_500),
        })
    );
}

#[test]
fn test_left_member_cannot_buy_or_leave_again() {
    let mut fx = joined_member1();
    let member1 = &members()[0];
    fx.ledger.leave(member1).unwrap();

    assert!(fx.ledger.buy_shares(member1, shares(1)).is_err());
    assert!(fx.ledger.leave(member1).is_err());
    assert_eq!(
        fx.ledger.join(member1),
        Err(LedgerError::AlreadyMember(member1.clone()))
    );
}

#[test]
fn test_admin_removes_member() {
    let mut fx = setup_joined();
    let member1 = &members()[0];

    assert_eq!(
        fx.ledger.remove_member(&eve(), member1),
        Err(LedgerError::Unauthorized {
            caller: eve(),
            role: sedao_types::Role::Admin,
        })
    );
    assert!(fx.ledger.is_member(member1));

    let balance = fx.ledger.remove_member(&admin(), member1).unwrap();
    assert_eq!(balance, shares(100));
    assert!(!fx.ledger.is_member(member1));
    assert_eq!(fx.ledger.member_state(member1), MemberState::NonMember);
    assert_eq!(fx.ledger.share_balance(member1), shares(100));

    assert!(matches!(
        fx.ledger.journal().last(),
        Some(LedgerEvent::MemberRemoved { .. })
    ));
    assert_eq!(
        fx.ledger.remove_member(&admin(), &eve()),
        Err(LedgerError::NotAMember(eve()))
    );
}

#[test]
fn test_removed_member_redeems_without_floor() {
    let mut fx = setup_joined();
    let member1 = &members()[0];
    fx.ledger.remove_member(&admin(), member1).unwrap();

    assert!(fx.ledger.buy_shares(member1, shares(1)).is_err());
    let payout = fx.ledger.redeem_shares(member1, shares(100)).unwrap();
    assert_eq!(payout, units(100));
    assert_eq!(
        fx.ledger.redeem_shares(member1, Shares::new(1)),
        Err(LedgerError::NotAMember(member1.clone()))
    );
}

#[test]
fn test_removed_member_can_rejoin() {
    let mut fx = setup_joined();
    let member1 = &members()[0];
    fx.ledger.remove_member(&admin(), member1).unwrap();

    fx.ledger.join(member1).unwrap();
    assert_eq!(fx.ledger.member_state(member1), MemberState::Active);
    assert_eq!(fx.ledger.share_balance(member1), shares(200));
    assert!(fx.ledger.verify_invariants().is_ok());
}

#[test]
fn test_failed_operations_leave_no_trace() {
    let mut fx = joined_member1();
    let member1 = &members()[0];
    let events = fx.ledger.events().len();
    let reserve = fx.ledger.reserve_balance();

    assert!(fx.ledger.redeem_shares(member1, shares(60)).is_err());
    assert!(fx.ledger.buy_shares(&eve(), shares(1)).is_err());
    fx.ledger.revoke(member1);
    assert!(fx.ledger.buy_shares(member1, shares(1)).is_err());

    assert_eq!(fx.ledger.events().len(), events);
    assert_eq!(fx.ledger.reserve_balance(), reserve);
    assert_eq!(fx.ledger.share_balance(member1), shares(100));
    assert_eq!(fx.ledger.payment_balance(member1), units(900));
}

#[test]
fn test_reserve_moves_only_through_operations() {
    let mut fx = setup_joined();
    let member1 = &members()[0];
    let reserve = fx.ledger.reserve_balance();

    // Member-side account calls never touch the pool
    fx.ledger.fund(&eve(), units(5_000));
    fx.ledger.approve(&eve(), units(5_000));
    fx.ledger.revoke(member1);
    fx.ledger.approve(member1, units(1_000_000));
    assert_eq!(fx.ledger.reserve_balance(), reserve);
    assert_eq!(fx.ledger.payment_balance(&eve()), units(6_000));
    assert!(fx.ledger.verify_invariants().is_ok());

    let payout = fx.ledger.redeem_shares(member1, shares(10)).unwrap();
    assert_eq!(fx.ledger.reserve_balance(), reserve.saturating_sub(payout));
    assert_eq!(fx.ledger.reserve().total_issued(), units(4_000 + 1_000 + 5_000));
    assert!(fx.ledger.verify_invariants().is_ok());
}
