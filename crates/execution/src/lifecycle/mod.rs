//! Custody lifecycle events.
//!
//! Every committed state transition of the position manager is recorded:
//! - Positions registered and released
//! - Deposits and withdrawals
//! - Fee distribution and collection
//! - Oracle maintenance

mod events;
mod log;

pub use events::*;
pub use log::*;
