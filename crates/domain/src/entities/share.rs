use crate::math::accrued_fees;
use crate::token::FeeAmounts;
use crate::value_objects::{Address, FeeGrowth, Liquidity, PositionId};
use serde::{Deserialize, Serialize};

/// A fungible claim held by `owner` on a custodied position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    pub owner: Address,
    pub position_id: PositionId,
    pub balance: Liquidity,

    /// Position fee growth at the last settlement.
    pub fee_checkpoint: FeeGrowth,
    /// Fees settled to this claim and not yet collected.
    pub fees_owed: FeeAmounts,
}

impl Share {
    /// An empty claim that starts earning from `growth` onwards.
    pub fn new(owner: Address, position_id: PositionId, growth: FeeGrowth) -> Self {
        Self {
            owner,
            position_id,
            balance: 0,
            fee_checkpoint: growth,
            fees_owed: FeeAmounts::zero(),
        }
    }

    /// Moves fees earned since the last checkpoint into `fees_owed`.
    ///
    /// Must run before every balance change, otherwise the new balance would
    /// earn on growth that accrued before it existed.
    pub fn settle(&mut self, growth: FeeGrowth) -> Option<FeeAmounts> {
        let delta = growth.since(self.fee_checkpoint)?;
        let earned = accrued_fees(self.balance, delta)?;
        self.fees_owed = self.fees_owed.checked_add(earned)?;
        self.fee_checkpoint = growth;
        Some(earned)
    }

    pub fn is_empty(&self) -> bool {
        self.balance == 0 && self.fees_owed.is_zero()
    }
}
