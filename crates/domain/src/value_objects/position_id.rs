use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token id of a unique-position asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub U256);

impl PositionId {
    pub fn new(id: impl Into<U256>) -> Self {
        Self(id.into())
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }
}

impl From<u64> for PositionId {
    fn from(v: u64) -> Self {
        Self(U256::from(v))
    }
}

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
