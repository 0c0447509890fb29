//! Pricing engine - net asset value per share

use crate::{equity::EquityLedger, reserve::ReserveAccessor};
use sedao_types::{LedgerResult, SharePrice};

/// Current share price: reserve balance over total supply
///
/// Fails with `ZeroSupply` instead of dividing by zero. Pure: reads the
/// two ledgers and nothing else.
pub fn share_price<R, E>(reserve: &R, equity: &E) -> LedgerResult<SharePrice>
where
    R: ReserveAccessor + ?Sized,
    E: EquityLedger + ?Sized,
{
    SharePrice::new(reserve.reserve_balance(), equity.total_supply())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{equity::InMemoryEquity, reserve::InMemoryReserve};
    use sedao_types::{Amount, LedgerError, Principal, Shares};

    #[test]
    fn test_price_tracks_reserve_and_supply() {
        let mut reserve = InMemoryReserve::new("pt");
        let mut equity = InMemoryEquity::new();
        let alice = Principal::new("alice");

        assert_eq!(
            share_price(&reserve, &equity),
            Err(LedgerError::ZeroSupply)
        );

        reserve.fund(&alice, Amount::new(300));
        reserve.approve(&alice, Amount::new(300));
        reserve.debit(&alice, Amount::new(300)).unwrap();
        equity.mint(&alice, Shares::new(100)).unwrap();

        let price = share_price(&reserve, &equity).unwrap();
        assert_eq!(price.value_of(Shares::new(10)).unwrap(), Amount::new(30));
        assert!((price.as_f64() - 3.0).abs() < f64::EPSILON);
    }
}
