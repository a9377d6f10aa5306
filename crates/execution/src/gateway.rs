//! Custody gateway.
//!
//! The only component that calls the position token. It does no accounting;
//! keeping every trust-sensitive external call in this file makes them easy
//! to enumerate and audit.

use crate::error::CustodyError;
use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId};
use lp_custody_protocols::{PositionToken, TransferError};
use std::sync::Arc;
use tracing::{debug, warn};

/// Bridge between the custodian and the unique-position asset.
#[derive(Clone)]
pub struct CustodyGateway {
    /// Principal that holds positions in custody.
    custodian: Address,
    /// Position token of the AMM.
    token: Arc<dyn PositionToken>,
}

impl CustodyGateway {
    /// Creates a gateway acting as `custodian` on `token`.
    pub fn new(custodian: Address, token: Arc<dyn PositionToken>) -> Self {
        Self { custodian, token }
    }

    pub fn custodian(&self) -> Address {
        self.custodian
    }

    /// Moves `amount` of `id` from `from` into custody.
    ///
    /// The custodian's balance is read before and after the transfer; the
    /// pull only succeeds if it grew by exactly `amount`.
    ///
    /// # Errors
    /// `ExternalTransferRejected` carrying the token's own rejection, or
    /// `Unconfirmed` when the transfer reported success without delivering.
    pub async fn pull_into_custody(
        &self,
        from: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<(), CustodyError> {
        debug!(position = %id, from = %from, amount, "Pulling position into custody");

        let before = self.custody_balance(id).await?;
        self.token
            .transfer(self.custodian, from, self.custodian, id, amount)
            .await
            .map_err(|e| reject(id, "pull", e))?;
        let after = self.custody_balance(id).await?;

        let observed = after.saturating_sub(before);
        if observed != amount {
            return Err(reject(
                id,
                "pull",
                TransferError::Unconfirmed {
                    id,
                    expected: amount,
                    observed,
                },
            ));
        }
        Ok(())
    }

    /// Releases `amount` of `id` from custody to `to`.
    pub async fn push_out_of_custody(
        &self,
        to: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<(), CustodyError> {
        debug!(position = %id, to = %to, amount, "Pushing position out of custody");

        self.token
            .transfer(self.custodian, self.custodian, to, id, amount)
            .await
            .map_err(|e| reject(id, "push", e))
    }

    /// Sends `fees` owed on the custodied part of `id` to `to`.
    pub async fn push_fees(
        &self,
        to: Address,
        id: PositionId,
        fees: FeeAmounts,
    ) -> Result<FeeAmounts, CustodyError> {
        debug!(position = %id, to = %to, fees = %fees, "Pushing fees out of custody");

        self.token
            .collect(self.custodian, id, to, fees)
            .await
            .map_err(|e| reject(id, "collect", e))
    }

    /// Quantity of `id` the custodian holds according to the token.
    pub async fn custody_balance(&self, id: PositionId) -> Result<Liquidity, CustodyError> {
        self.token
            .balance_of(self.custodian, id)
            .await
            .map_err(|e| reject(id, "balance query", e))
    }
}

fn reject(id: PositionId, operation: &'static str, error: TransferError) -> CustodyError {
    warn!(position = %id, operation, error = %error, "Position token rejected call");
    CustodyError::ExternalTransferRejected(error)
}
