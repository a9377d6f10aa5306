pub mod address;
pub mod fee_growth;
pub mod position_id;
pub mod price;

pub use address::Address;
pub use fee_growth::FeeGrowth;
pub use position_id::PositionId;
pub use price::Price;

/// Liquidity units, as reported by the pool.
pub type Liquidity = u128;
