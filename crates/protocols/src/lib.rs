//! External interfaces consumed by the custody engine.
//!
//! The custody core never talks to an AMM directly; it goes through the two
//! narrow traits defined here:
//! - [`PositionToken`]: the unique-position asset (transfers, ownership, fee collection)
//! - [`PoolOracle`]: read-only pool state and the time-weighted price oracle
//!
//! [`memory::InMemoryAmm`] implements both for tests and local simulation.

/// Error types for external calls.
pub mod error;
/// In-memory AMM used for tests and simulation.
pub mod memory;
/// Pool state and price oracle interface.
pub mod pool;
/// Unique-position asset interface.
pub mod position_token;
/// Prelude module for convenient imports.
pub mod prelude;

pub use error::{OracleError, TransferError};
pub use pool::{ObservationState, PoolOracle};
pub use position_token::PositionToken;
