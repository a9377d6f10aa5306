use super::fees::PendingFees;
use super::{PositionManager, WithdrawReceipt};
use crate::error::CustodyError;
use crate::lifecycle::{BalanceChangeData, FeesData};
use crate::registry::LiquidityDelta;
use lp_custody_domain::{Address, Liquidity, PositionId, PositionStatus};
use tracing::{debug, warn};

impl PositionManager {
    /// Burns `amount` of `caller`'s shares of `id` and releases the same
    /// liquidity from custody to `caller`. Returns the liquidity released.
    ///
    /// Shares are burned before the release. If the release is rejected the
    /// registry and the caller's claim are rolled back and no event is
    /// recorded.
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero amount
    /// - `InsufficientBalance` if `caller` holds fewer than `amount` shares
    /// - `ExternalTransferRejected` if the release fails
    pub async fn withdraw(
        &mut self,
        caller: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<Liquidity, CustodyError> {
        debug!(position = %id, caller = %caller, amount, "Withdrawal requested");

        if amount == 0 {
            return Err(CustodyError::InvalidAmount);
        }
        let available = self.ledger.balance_of(caller, id);
        if amount > available {
            return Err(CustodyError::InsufficientBalance {
                owner: caller,
                id,
                available,
                requested: amount,
            });
        }

        let pending = self.pending_fees(id).await?;

        let checkpoint = self.checkpoint(caller, id);
        let (update, resulting_balance) = match self.debit(caller, id, amount, pending) {
            Ok(booked) => booked,
            Err(e) => {
                self.rollback(checkpoint);
                return Err(e);
            }
        };

        if let Err(e) = self.gateway.push_out_of_custody(caller, id, amount).await {
            warn!(
                position = %id,
                caller = %caller,
                amount,
                error = %e,
                "Release rejected, restoring shares"
            );
            self.rollback(checkpoint);
            return Err(e);
        }

        self.record_fee_update(id, caller, update);
        let position_total = self.registry.liquidity(id)?;
        self.events.record_withdrawal(
            id,
            caller,
            BalanceChangeData {
                amount,
                resulting_balance,
                position_total,
            },
        );
        self.prune(id, caller);
        Ok(amount)
    }

    /// Withdraws `caller`'s whole balance from every position, by ascending id.
    ///
    /// Each position is a separate withdrawal. The sweep stops at the first
    /// failure and returns it; withdrawals before it stay committed.
    pub async fn withdraw_all(&mut self, caller: Address) -> Result<Vec<WithdrawReceipt>, CustodyError> {
        let holdings: Vec<(PositionId, Liquidity)> = self
            .ledger
            .shares_of(caller)
            .filter(|share| share.balance > 0)
            .map(|share| (share.position_id, share.balance))
            .collect();

        let mut receipts = Vec::with_capacity(holdings.len());
        for (position_id, balance) in holdings {
            let amount = self.withdraw(caller, position_id, balance).await?;
            receipts.push(WithdrawReceipt { position_id, amount });
        }
        Ok(receipts)
    }

    /// Distributes pending fees, then burns shares and lowers the registry.
    /// Returns the new balance.
    fn debit(
        &mut self,
        caller: Address,
        id: PositionId,
        amount: Liquidity,
        pending: PendingFees,
    ) -> Result<(Option<FeesData>, Liquidity), CustodyError> {
        let update = self.apply_fees(id, pending)?;
        let growth = self.registry.fee_growth(id);
        let balance = self.ledger.burn(caller, id, amount, growth)?;
        self.registry.adjust(id, LiquidityDelta::Decrease(amount))?;
        Ok((update, balance))
    }

    /// Drops `id` from the registry once nothing backs it and no claim
    /// references it. Fee dust no claim can reach is dropped with it.
    pub(super) fn prune(&mut self, id: PositionId, account: Address) {
        let drained = self
            .registry
            .get(id)
            .is_ok_and(|position| position.status() != PositionStatus::Active);
        if !drained || self.ledger.has_claims(id) {
            return;
        }
        if let Some(position) = self.registry.remove(id) {
            if position.status() == PositionStatus::Drained {
                debug!(position = %id, dust = %position.uncollected_fees, "Dropping unclaimable fee dust");
            }
            self.events.record_released(id, account);
        }
    }
}
