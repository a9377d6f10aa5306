use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    /// Liquidity is held in custody.
    Active,
    /// All liquidity was released but fees are still owed to holders.
    Drained,
    /// Nothing left to account for; the record can be dropped.
    Empty,
}
