use crate::error::TransferError;
use async_trait::async_trait;
use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId};

/// The unique-position asset of the AMM.
///
/// Every `operator` argument is the principal issuing the call; moving an
/// asset held by somebody else requires that holder's approval.
#[async_trait]
pub trait PositionToken: Send + Sync {
    /// Moves `amount` of `id` from `from` to `to`.
    async fn transfer(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<(), TransferError>;

    /// Quantity of `id` held by `owner`.
    async fn balance_of(&self, owner: Address, id: PositionId) -> Result<Liquidity, TransferError>;

    /// Principal holding the largest part of `id`.
    async fn owner_of(&self, id: PositionId) -> Result<Address, TransferError>;

    /// Sends fees owed to `operator`'s holding of `id` to `recipient`.
    /// Returns the amounts actually sent.
    async fn collect(
        &self,
        operator: Address,
        id: PositionId,
        recipient: Address,
        amounts: FeeAmounts,
    ) -> Result<FeeAmounts, TransferError>;
}
