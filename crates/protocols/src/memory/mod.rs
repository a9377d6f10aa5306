//! In-memory AMM.
//!
//! A self-contained stand-in for a concentrated-liquidity pool and its
//! position token. It keeps per-holder balances of every position id,
//! fees owed per holder, and a ring of price observations, and exposes hooks
//! to script failures from tests.

mod amm;
mod oracle;

pub use amm::InMemoryAmm;
