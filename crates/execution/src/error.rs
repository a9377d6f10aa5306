//! Errors raised by the custody engine.

use lp_custody_domain::{Address, Liquidity, PositionId};
use lp_custody_protocols::{OracleError, TransferError};
use thiserror::Error;

/// Broad class of a [`CustodyError`], used to decide how a caller reacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request; rejected before any external call.
    Validation,
    /// Caller lacks the right to perform the operation.
    Authorization,
    /// The AMM or its position token refused or failed.
    External,
    /// Internal bookkeeping is inconsistent. Never expected in correct code.
    Invariant,
}

/// Error type for every custody operation.
///
/// Any error aborts the whole operation: no partial ledger or registry change
/// survives it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustodyError {
    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("position {0} is not registered")]
    NotFound(PositionId),

    #[error("position {id} is already registered to {custodian}")]
    AlreadyRegistered { id: PositionId, custodian: Address },

    #[error("liquidity of position {id} would underflow: {available} available, {requested} requested")]
    Underflow {
        id: PositionId,
        available: Liquidity,
        requested: Liquidity,
    },

    #[error("arithmetic overflow while {0}")]
    Overflow(&'static str),

    #[error("insufficient balance: {owner} holds {available} of position {id}, requested {requested}")]
    InsufficientBalance {
        owner: Address,
        id: PositionId,
        available: Liquidity,
        requested: Liquidity,
    },

    #[error("no fees owed to {owner} on position {id}")]
    NothingToCollect { owner: Address, id: PositionId },

    #[error("batch is empty")]
    EmptyBatch,

    #[error("batch of {size} deposits exceeds the limit of {max}")]
    BatchTooLarge { size: usize, max: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{caller} is not authorized to {action}")]
    Unauthorized {
        caller: Address,
        action: &'static str,
    },

    #[error("external transfer rejected: {0}")]
    ExternalTransferRejected(#[source] TransferError),

    #[error(
        "oracle not ready: cardinality {cardinality} of {required} required, \
         {history_secs}s of history for a {window_secs}s window"
    )]
    OracleNotReady {
        cardinality: u16,
        required: u16,
        history_secs: u64,
        window_secs: u32,
    },

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// A batch failed and some of its positions could not be handed back.
    #[error("batch aborted ({source}); positions still credited: {retained:?}")]
    PartialBatch {
        #[source]
        source: Box<CustodyError>,
        retained: Vec<PositionId>,
    },

    #[error("accounting invariant violated: {0}")]
    AccountingInvariantViolation(String),
}

impl CustodyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidAmount
            | Self::NotFound(_)
            | Self::AlreadyRegistered { .. }
            | Self::Overflow(_)
            | Self::InsufficientBalance { .. }
            | Self::NothingToCollect { .. }
            | Self::EmptyBatch
            | Self::BatchTooLarge { .. }
            | Self::InvalidConfig(_) => ErrorKind::Validation,
            Self::Unauthorized { .. } => ErrorKind::Authorization,
            Self::ExternalTransferRejected(_)
            | Self::OracleNotReady { .. }
            | Self::Oracle(_)
            | Self::PartialBatch { .. } => ErrorKind::External,
            Self::Underflow { .. } | Self::AccountingInvariantViolation(_) => ErrorKind::Invariant,
        }
    }

    /// The external rejection behind this error, if any.
    pub fn transfer_error(&self) -> Option<&TransferError> {
        match self {
            Self::ExternalTransferRejected(e) => Some(e),
            Self::PartialBatch { source, .. } => source.transfer_error(),
            _ => None,
        }
    }
}

impl From<TransferError> for CustodyError {
    fn from(e: TransferError) -> Self {
        Self::ExternalTransferRejected(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_external_rejection_is_passed_through() {
        let cause = TransferError::NonexistentToken {
            id: PositionId::from(22u64),
        };
        let err = CustodyError::from(cause.clone());

        assert_eq!(err.kind(), ErrorKind::External);
        assert_eq!(err.transfer_error(), Some(&cause));
        assert_eq!(err.source().map(|s| s.to_string()), Some(cause.to_string()));
        assert!(err.to_string().ends_with(&cause.to_string()));
    }

    #[test]
    fn test_kinds() {
        assert_eq!(CustodyError::InvalidAmount.kind(), ErrorKind::Validation);
        assert_eq!(
            CustodyError::Unauthorized {
                caller: Address::zero(),
                action: "test",
            }
            .kind(),
            ErrorKind::Authorization
        );
        assert_eq!(
            CustodyError::AccountingInvariantViolation("x".into()).kind(),
            ErrorKind::Invariant
        );
    }
}
