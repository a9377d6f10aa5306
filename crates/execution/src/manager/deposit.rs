use super::PositionManager;
use super::fees::PendingFees;
use crate::error::CustodyError;
use crate::lifecycle::{BalanceChangeData, FeesData, RegistrationData};
use lp_custody_domain::{Address, Liquidity, PositionId};
use tracing::{debug, error, warn};

impl PositionManager {
    /// Moves `amount` of position `id` from `caller` into custody and mints
    /// the same number of shares to `caller`. Returns the shares minted.
    ///
    /// The caller must have approved the custodian on the position token.
    /// Fees accrued before the deposit are distributed to the existing
    /// holders first.
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero amount, before any external call
    /// - `ExternalTransferRejected` if the pull fails; nothing is credited
    pub async fn deposit(
        &mut self,
        caller: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<Liquidity, CustodyError> {
        debug!(position = %id, caller = %caller, amount, "Deposit requested");

        self.ledger.can_mint(caller, id, amount)?;
        self.registry.can_increase(id, amount)?;

        let pending = if self.registry.contains(id) {
            self.pending_fees(id).await?
        } else {
            PendingFees::default()
        };

        self.gateway.pull_into_custody(caller, id, amount).await?;
        self.credit(caller, id, amount, pending)?;
        Ok(amount)
    }

    /// Deposits every `(id, amount)` pair in order, all or nothing.
    ///
    /// If any deposit fails, the ones already made in this batch are
    /// withdrawn back to `caller` in reverse order. Returns the shares
    /// minted per item.
    ///
    /// # Errors
    /// The failing deposit's error, or `PartialBatch` naming the positions
    /// that could not be handed back.
    pub async fn deposit_many(
        &mut self,
        caller: Address,
        items: &[(PositionId, Liquidity)],
    ) -> Result<Vec<Liquidity>, CustodyError> {
        if items.is_empty() {
            return Err(CustodyError::EmptyBatch);
        }
        if items.len() > self.config.max_batch_size {
            return Err(CustodyError::BatchTooLarge {
                size: items.len(),
                max: self.config.max_batch_size,
            });
        }
        if items.iter().any(|(_, amount)| *amount == 0) {
            return Err(CustodyError::InvalidAmount);
        }

        let mut minted = Vec::with_capacity(items.len());
        for (index, (id, amount)) in items.iter().enumerate() {
            match self.deposit(caller, *id, *amount).await {
                Ok(shares) => minted.push(shares),
                Err(e) => {
                    warn!(
                        caller = %caller,
                        position = %id,
                        index,
                        error = %e,
                        "Batch deposit failed, unwinding"
                    );
                    return Err(self.unwind_batch(caller, &items[..index], e).await);
                }
            }
        }
        Ok(minted)
    }

    /// Books a confirmed pull: pending fees first, then the registry and
    /// the ledger together.
    fn credit(
        &mut self,
        caller: Address,
        id: PositionId,
        amount: Liquidity,
        pending: PendingFees,
    ) -> Result<(), CustodyError> {
        let fresh = !self.registry.contains(id);
        let checkpoint = self.checkpoint(caller, id);

        let (update, resulting_balance, position_total) = match self.book_credit(caller, id, amount, pending) {
            Ok(booked) => booked,
            Err(e) => {
                error!(position = %id, caller = %caller, amount, error = %e, "Failed to book pulled liquidity");
                self.rollback(checkpoint);
                return Err(e);
            }
        };

        self.record_fee_update(id, caller, update);
        if fresh {
            self.events.record_registered(
                id,
                caller,
                RegistrationData {
                    custodian: self.registry.custodian(),
                    liquidity: position_total,
                },
            );
        }
        self.events.record_deposit(
            id,
            caller,
            BalanceChangeData {
                amount,
                resulting_balance,
                position_total,
            },
        );
        Ok(())
    }

    fn book_credit(
        &mut self,
        caller: Address,
        id: PositionId,
        amount: Liquidity,
        pending: PendingFees,
    ) -> Result<(Option<FeesData>, Liquidity, Liquidity), CustodyError> {
        let update = self.apply_fees(id, pending)?;
        let position_total = self.registry.register_or_adjust(id, amount)?;
        let growth = self.registry.fee_growth(id);
        let resulting_balance = self.ledger.mint(caller, id, amount, growth)?;
        Ok((update, resulting_balance, position_total))
    }

    async fn unwind_batch(
        &mut self,
        caller: Address,
        done: &[(PositionId, Liquidity)],
        cause: CustodyError,
    ) -> CustodyError {
        let mut retained = Vec::new();
        for (id, amount) in done.iter().rev() {
            if let Err(e) = self.withdraw(caller, *id, *amount).await {
                error!(
                    caller = %caller,
                    position = %id,
                    amount,
                    error = %e,
                    "Failed to hand back batch deposit"
                );
                retained.push(*id);
            }
        }

        if retained.is_empty() {
            cause
        } else {
            CustodyError::PartialBatch {
                source: Box::new(cause),
                retained,
            }
        }
    }
}
