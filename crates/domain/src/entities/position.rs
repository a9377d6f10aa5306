use crate::enums::PositionStatus;
use crate::token::FeeAmounts;
use crate::value_objects::{Address, FeeGrowth, Liquidity, PositionId};
use serde::{Deserialize, Serialize};

/// A unique external liquidity position held in custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub custodian: Address,

    /// Last known liquidity backing the position.
    pub liquidity_amount: Liquidity,

    /// Fees distributed to holders but not yet collected from the pool.
    pub uncollected_fees: FeeAmounts,
    pub fee_growth_per_share: FeeGrowth,
}

impl Position {
    pub fn new(id: PositionId, custodian: Address, liquidity_amount: Liquidity) -> Self {
        Self {
            id,
            custodian,
            liquidity_amount,
            uncollected_fees: FeeAmounts::zero(),
            fee_growth_per_share: FeeGrowth::zero(),
        }
    }

    pub fn status(&self) -> PositionStatus {
        if self.liquidity_amount > 0 {
            PositionStatus::Active
        } else if !self.uncollected_fees.is_zero() {
            PositionStatus::Drained
        } else {
            PositionStatus::Empty
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_follows_liquidity_and_fees() {
        let mut position = Position::new(PositionId::from(1u64), Address::from_low_u64_be(9), 10);
        assert_eq!(position.status(), PositionStatus::Active);

        position.liquidity_amount = 0;
        position.uncollected_fees = FeeAmounts::new(1u64, 0u64);
        assert_eq!(position.status(), PositionStatus::Drained);

        position.uncollected_fees = FeeAmounts::zero();
        assert_eq!(position.status(), PositionStatus::Empty);
    }
}
