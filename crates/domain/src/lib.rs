//! Domain types for the liquidity position custody engine.
//!
//! This crate holds the plain data the rest of the workspace passes around:
//! - Principals and position identifiers
//! - Token and fee amounts
//! - Registered positions and the share claims drawn against them
//! - Fixed-point fee growth math

/// Position and share entities.
pub mod entities;
/// Enumerations shared across crates.
pub mod enums;
/// Q64 fee growth math.
pub mod math;
/// Token amount types.
pub mod token;
/// Small value objects.
pub mod value_objects;

pub use entities::{Position, Share};
pub use enums::PositionStatus;
pub use token::{FeeAmounts, TokenAmount};
pub use value_objects::{Address, FeeGrowth, Liquidity, PositionId, Price};
