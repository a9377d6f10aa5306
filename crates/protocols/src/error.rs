//! Errors reported by the external AMM and its position token.
//!
//! These are surfaced to custody callers unchanged, so the messages mirror
//! what the remote side reports.

use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId};
use thiserror::Error;

/// Rejection of a transfer or collect call on the position token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    /// The id has never been minted or was burned.
    #[error("ERC721: operator query for nonexistent token {id}")]
    NonexistentToken { id: PositionId },

    /// The sender holds less of the id than requested.
    #[error("balance too low for this id: {holder} holds {available} of {id}, requested {requested}")]
    InsufficientBalance {
        id: PositionId,
        holder: Address,
        available: Liquidity,
        requested: Liquidity,
    },

    /// The operator moving the asset was not approved by its holder.
    #[error("operator {operator} is not approved by {owner}")]
    NotApproved { owner: Address, operator: Address },

    /// A collect asked for more than the position owes.
    #[error("collect of {requested} exceeds fees owed {owed} on {id}")]
    InsufficientFees {
        id: PositionId,
        owed: FeeAmounts,
        requested: FeeAmounts,
    },

    /// The call reported success but custody did not change as expected.
    #[error("transfer of {id} not confirmed: expected custody increase of {expected}, observed {observed}")]
    Unconfirmed {
        id: PositionId,
        expected: Liquidity,
        observed: Liquidity,
    },

    /// Any other rejection, message kept as reported.
    #[error("{0}")]
    Rejected(String),
}

/// Failure reading pool state or the price oracle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OracleError {
    /// The oracle does not hold observations that far back.
    #[error("OLD: oldest observation is {available_secs}s old, {requested_secs}s requested")]
    InsufficientHistory {
        available_secs: u64,
        requested_secs: u32,
    },

    /// Fees were requested for a position the pool does not know.
    #[error("position {0} not found in pool")]
    UnknownPosition(PositionId),

    #[error("oracle unavailable: {0}")]
    Unavailable(String),
}
