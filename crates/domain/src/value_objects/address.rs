use primitive_types::H160;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A principal: a user, the manager owner or the custodian itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub H160);

impl Address {
    pub const ZERO: Address = Address(H160([0u8; 20]));
    pub const MAX: Address = Address(H160([0xffu8; 20]));

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(H160(bytes))
    }

    pub fn zero() -> Self {
        Self(H160::zero())
    }

    /// Builds an address whose low 8 bytes are `v`, handy for fixtures.
    pub fn from_low_u64_be(v: u64) -> Self {
        Self(H160::from_low_u64_be(v))
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<H160> for Address {
    fn from(v: H160) -> Self {
        Self(v)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
