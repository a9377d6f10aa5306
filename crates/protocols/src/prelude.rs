//! Prelude module for convenient imports.
//!
//! ```rust
//! use lp_custody_protocols::prelude::*;
//! ```

pub use crate::error::{OracleError, TransferError};
pub use crate::memory::InMemoryAmm;
pub use crate::pool::{ObservationState, PoolOracle};
pub use crate::position_token::PositionToken;
