use crate::token::{FeeAmounts, TokenAmount};
use crate::value_objects::{FeeGrowth, Liquidity};
use primitive_types::U256;

/// Fractional bits carried by fee growth values.
pub const RESOLUTION: usize = 64;

/// Largest amount that can be shifted left by [`RESOLUTION`] without losing bits.
const MAX_SHIFTABLE_BITS: usize = 256 - RESOLUTION;

/// Growth per share produced by distributing `fees` over `total_shares`.
/// growth = fees * 2^64 / total_shares
///
/// Returns `None` when there are no shares to distribute over or the amount
/// does not fit the fixed-point range.
pub fn growth_increment(fees: FeeAmounts, total_shares: Liquidity) -> Option<FeeGrowth> {
    if total_shares == 0 {
        return None;
    }
    let shares = U256::from(total_shares);

    Some(FeeGrowth {
        growth0_x64: shift_div(fees.amount0.as_u256(), shares)?,
        growth1_x64: shift_div(fees.amount1.as_u256(), shares)?,
    })
}

/// Fees owed to `balance` shares for `growth_delta` of accrued growth.
/// owed = balance * delta / 2^64, rounded down
pub fn accrued_fees(balance: Liquidity, growth_delta: FeeGrowth) -> Option<FeeAmounts> {
    Some(FeeAmounts {
        amount0: TokenAmount(mul_shift(balance, growth_delta.growth0_x64)?),
        amount1: TokenAmount(mul_shift(balance, growth_delta.growth1_x64)?),
    })
}

fn shift_div(amount: U256, shares: U256) -> Option<U256> {
    if amount.bits() > MAX_SHIFTABLE_BITS {
        return None;
    }
    (amount << RESOLUTION).checked_div(shares)
}

fn mul_shift(balance: Liquidity, growth_x64: U256) -> Option<U256> {
    let product = U256::from(balance).full_mul(growth_x64) >> RESOLUTION;
    U256::try_from(product).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_increment_requires_shares() {
        assert!(growth_increment(FeeAmounts::new(1u64, 1u64), 0).is_none());
    }

    #[test]
    fn test_growth_round_trip_is_exact_for_even_split() {
        let fees = FeeAmounts::new(1_000u64, 3_000u64);
        let growth = growth_increment(fees, 4).unwrap();

        // Each of four unit shares earns a quarter.
        assert_eq!(accrued_fees(1, growth).unwrap(), FeeAmounts::new(250u64, 750u64));
        assert_eq!(accrued_fees(4, growth).unwrap(), fees);
    }

    #[test]
    fn test_accrued_fees_round_down() {
        let growth = growth_increment(FeeAmounts::new(10u64, 0u64), 3).unwrap();

        let owed = accrued_fees(1, growth).unwrap();
        assert_eq!(owed.amount0, TokenAmount::from(3u64));

        // Three holders never receive more than was distributed.
        let total = accrued_fees(3, growth).unwrap();
        assert!(total.amount0 <= TokenAmount::from(10u64));
    }

    #[test]
    fn test_growth_increment_rejects_out_of_range_amounts() {
        let huge = FeeAmounts {
            amount0: TokenAmount(U256::MAX),
            amount1: TokenAmount::zero(),
        };
        assert!(growth_increment(huge, 1).is_none());
    }

    #[test]
    fn test_large_liquidity_does_not_overflow() {
        let growth = growth_increment(FeeAmounts::new(u128::MAX, 1u64), u128::MAX).unwrap();
        let owed = accrued_fees(u128::MAX, growth).unwrap();
        assert!(owed.amount0.as_u256() <= U256::from(u128::MAX));
    }
}
