//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types from the crate.
//!
//! # Example
//!
//! ```rust
//! use lp_custody_execution::prelude::*;
//! ```

// Config
pub use crate::config::{ConfigError, ManagerConfig};

// Errors
pub use crate::error::{CustodyError, ErrorKind};

// Components
pub use crate::gateway::CustodyGateway;
pub use crate::ledger::ShareLedger;
pub use crate::registry::{LiquidityDelta, PositionRegistry};

// Lifecycle
pub use crate::lifecycle::{
    BalanceChangeData, CustodyEvent, CustodyEventType, EventData, EventLog, FeesData,
    MaintenanceData, RegistrationData,
};

// Manager
pub use crate::manager::{PositionManager, SharedPositionManager, WithdrawReceipt};

// Domain and protocol types used in the manager's signatures
pub use lp_custody_domain::{Address, FeeAmounts, Liquidity, Position, PositionId, Price, Share};
pub use lp_custody_protocols::{ObservationState, OracleError, PoolOracle, PositionToken, TransferError};
