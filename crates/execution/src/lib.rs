//! Custody engine for externally minted liquidity positions.
//!
//! Users hand unique AMM positions to a custodian and receive fungible
//! shares in return. This crate provides:
//! - The position registry: what is held in custody
//! - The share ledger: who claims how much of it, and the fees they are owed
//! - The custody gateway: the single bridge to the position token
//! - The position manager: deposits, withdrawals, fee collection and
//!   oracle maintenance as atomic transitions
//! - Lifecycle events and configuration

/// Prelude module for convenient imports.
pub mod prelude;

/// Configuration.
pub mod config;
/// Error types.
pub mod error;
/// Custody gateway.
pub mod gateway;
/// Share ledger.
pub mod ledger;
/// Custody lifecycle events.
pub mod lifecycle;
/// Deposit/withdraw controller.
pub mod manager;
/// Position registry.
pub mod registry;

pub use config::{ConfigError, ManagerConfig};
pub use error::{CustodyError, ErrorKind};
pub use manager::{PositionManager, SharedPositionManager, WithdrawReceipt};
