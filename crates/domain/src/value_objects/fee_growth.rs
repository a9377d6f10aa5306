use primitive_types::U256;
use serde::{Deserialize, Serialize};

/// Cumulative fees earned per unit of share, Q64 fixed point, per token side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeGrowth {
    pub growth0_x64: U256,
    pub growth1_x64: U256,
}

impl FeeGrowth {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        Some(Self {
            growth0_x64: self.growth0_x64.checked_add(other.growth0_x64)?,
            growth1_x64: self.growth1_x64.checked_add(other.growth1_x64)?,
        })
    }

    /// Growth accrued since `checkpoint`. Growth only ever increases, so a
    /// checkpoint ahead of `self` is a bookkeeping defect and yields `None`.
    pub fn since(self, checkpoint: Self) -> Option<Self> {
        Some(Self {
            growth0_x64: self.growth0_x64.checked_sub(checkpoint.growth0_x64)?,
            growth1_x64: self.growth1_x64.checked_sub(checkpoint.growth1_x64)?,
        })
    }
}
