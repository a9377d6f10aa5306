use super::PositionManager;
use crate::error::CustodyError;
use crate::lifecycle::FeesData;
use lp_custody_domain::math::growth_increment;
use lp_custody_domain::{Address, FeeAmounts, FeeGrowth, PositionId};
use tracing::{debug, warn};

/// Fees the pool accrued for the custodian that holders have not been
/// credited with yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct PendingFees {
    fees: FeeAmounts,
    /// Growth per share the fees represent.
    growth: FeeGrowth,
}

impl PositionManager {
    /// Distributes fees the pool accrued on `id` since the last call over
    /// the current holders. Returns the newly distributed fees.
    ///
    /// Anyone may call this. Fees accrued while no shares exist are left
    /// undistributed.
    ///
    /// # Errors
    /// `NotFound` for an unregistered id, `Oracle` if the pool read fails.
    pub async fn update_uncollected_fees(
        &mut self,
        caller: Address,
        id: PositionId,
    ) -> Result<FeeAmounts, CustodyError> {
        let pending = self.pending_fees(id).await?;
        let update = self.apply_fees(id, pending)?;
        self.record_fee_update(id, caller, update);
        Ok(pending.fees)
    }

    /// Sends every fee `caller` is owed on `id` to `caller`. Returns the
    /// fees the token delivered.
    ///
    /// Nothing is booked unless the push succeeds. If the token delivers
    /// less than requested, the remainder stays owed to `caller`.
    ///
    /// # Errors
    /// `NothingToCollect` when nothing is owed, `ExternalTransferRejected`
    /// if the push fails.
    pub async fn collect_fees(&mut self, caller: Address, id: PositionId) -> Result<FeeAmounts, CustodyError> {
        let pending = self.pending_fees(id).await?;

        let checkpoint = self.checkpoint(caller, id);
        let (update, fees, growth) = match self.book_collection(caller, id, pending) {
            Ok(booked) => booked,
            Err(e) => {
                self.rollback(checkpoint);
                return Err(e);
            }
        };

        let sent = match self.gateway.push_fees(caller, id, fees).await {
            Ok(sent) => sent,
            Err(e) => {
                warn!(position = %id, caller = %caller, fees = %fees, error = %e, "Fee push rejected, restoring owed fees");
                self.rollback(checkpoint);
                return Err(e);
            }
        };
        let delivered = self.keep_shortfall_owed(caller, id, fees, sent, growth)?;

        self.record_fee_update(id, caller, update);
        let uncollected = self.registry.get(id)?.uncollected_fees;
        self.events.record_fees_collected(
            id,
            caller,
            FeesData {
                fees: delivered,
                uncollected,
            },
        );
        self.prune(id, caller);
        Ok(delivered)
    }

    /// Reads the pool's view of the custodian's fees on `id` and works out
    /// what is new. Changes nothing.
    pub(super) async fn pending_fees(&self, id: PositionId) -> Result<PendingFees, CustodyError> {
        let distributed = self.registry.get(id)?.uncollected_fees;
        let accrued = self.pool.fees_owed(id, self.registry.custodian()).await?;

        let fresh = accrued.saturating_sub(distributed);
        if fresh.is_zero() {
            return Ok(PendingFees::default());
        }

        let supply = self.ledger.total_supply(id);
        if supply == 0 {
            debug!(position = %id, fees = %fresh, "No shares outstanding, fees left undistributed");
            return Ok(PendingFees::default());
        }
        let growth = growth_increment(fresh, supply).ok_or(CustodyError::Overflow("computing fee growth"))?;
        self.registry.can_record_fees(id, fresh, growth)?;

        Ok(PendingFees { fees: fresh, growth })
    }

    /// Books `pending` in the registry. Returns the event data to record
    /// once the enclosing operation commits.
    pub(super) fn apply_fees(&mut self, id: PositionId, pending: PendingFees) -> Result<Option<FeesData>, CustodyError> {
        if pending.fees.is_zero() {
            return Ok(None);
        }
        let uncollected = self
            .registry
            .record_fees(id, pending.fees, pending.growth)?
            .uncollected_fees;
        Ok(Some(FeesData {
            fees: pending.fees,
            uncollected,
        }))
    }

    pub(super) fn record_fee_update(&mut self, id: PositionId, account: Address, update: Option<FeesData>) {
        if let Some(data) = update {
            self.events.record_fees_updated(id, account, data);
        }
    }

    /// Distributes pending fees, then moves everything `caller` is owed out
    /// of the ledger and the registry.
    fn book_collection(
        &mut self,
        caller: Address,
        id: PositionId,
        pending: PendingFees,
    ) -> Result<(Option<FeesData>, FeeAmounts, FeeGrowth), CustodyError> {
        let update = self.apply_fees(id, pending)?;
        let growth = self.registry.fee_growth(id);

        let owed = self.ledger.settle(caller, id, growth)?;
        if owed.is_zero() {
            return Err(CustodyError::NothingToCollect { owner: caller, id });
        }
        let fees = self.ledger.take_fees(caller, id);
        self.registry.release_fees(id, fees)?;
        Ok((update, fees, growth))
    }

    /// Credits back to `caller` whatever part of `fees` the token did not
    /// send. Returns the part that was sent.
    fn keep_shortfall_owed(
        &mut self,
        caller: Address,
        id: PositionId,
        fees: FeeAmounts,
        sent: FeeAmounts,
        growth: FeeGrowth,
    ) -> Result<FeeAmounts, CustodyError> {
        if sent == fees {
            return Ok(fees);
        }
        if !fees.covers(&sent) {
            warn!(position = %id, requested = %fees, sent = %sent, "Token sent more fees than requested");
        }

        let shortfall = fees.saturating_sub(sent);
        if !shortfall.is_zero() {
            warn!(
                position = %id,
                caller = %caller,
                requested = %fees,
                sent = %sent,
                "Token sent less than requested, remainder stays owed"
            );
            self.ledger.restore_fees(caller, id, shortfall, growth)?;
            self.registry.record_fees(id, shortfall, FeeGrowth::zero())?;
        }
        Ok(fees.saturating_sub(shortfall))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use crate::config::ManagerConfig;
    use crate::error::{CustodyError, ErrorKind};
    use crate::lifecycle::{CustodyEventType, EventData};
    use crate::manager::PositionManager;
    use async_trait::async_trait;
    use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId, Price, TokenAmount};
    use lp_custody_protocols::memory::InMemoryAmm;
    use lp_custody_protocols::{PositionToken, TransferError};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    /// Position token that sends only half of each fee collection.
    struct HalfPayingToken(Arc<InMemoryAmm>);

    #[async_trait]
    impl PositionToken for HalfPayingToken {
        async fn transfer(
            &self,
            operator: Address,
            from: Address,
            to: Address,
            id: PositionId,
            amount: Liquidity,
        ) -> Result<(), TransferError> {
            self.0.transfer(operator, from, to, id, amount).await
        }

        async fn balance_of(&self, owner: Address, id: PositionId) -> Result<Liquidity, TransferError> {
            self.0.balance_of(owner, id).await
        }

        async fn owner_of(&self, id: PositionId) -> Result<Address, TransferError> {
            self.0.owner_of(id).await
        }

        async fn collect(
            &self,
            operator: Address,
            id: PositionId,
            recipient: Address,
            amounts: FeeAmounts,
        ) -> Result<FeeAmounts, TransferError> {
            let half = FeeAmounts {
                amount0: TokenAmount::new(amounts.amount0.as_u256() / 2),
                amount1: TokenAmount::new(amounts.amount1.as_u256() / 2),
            };
            self.0.collect(operator, id, recipient, half).await
        }
    }

    #[tokio::test]
    async fn test_fees_split_by_share_balance() {
        let (mut manager, amm) = setup();
        let id = mint_for(&amm, alice(), 300).await;
        amm.transfer(alice(), alice(), bob(), id, 100).await.unwrap();
        amm.set_approval_for_all(bob(), vault(), true).await;
        manager.deposit(alice(), id, 200).await.unwrap();
        manager.deposit(bob(), id, 100).await.unwrap();

        amm.accrue_fees(id, FeeAmounts::new(300u64, 75u64)).await.unwrap();
        let fresh = manager.update_uncollected_fees(bob(), id).await.unwrap();

        assert_eq!(fresh, FeeAmounts::new(300u64, 75u64));
        assert_eq!(manager.fees_owed(alice(), id), FeeAmounts::new(200u64, 50u64));
        assert_eq!(manager.fees_owed(bob(), id), FeeAmounts::new(100u64, 25u64));
        assert_eq!(manager.position(id).unwrap().uncollected_fees, fresh);

        // A second call finds nothing new.
        assert!(manager.update_uncollected_fees(bob(), id).await.unwrap().is_zero());
    }

    #[tokio::test]
    async fn test_later_depositor_does_not_share_earlier_fees() {
        let (mut manager, amm) = setup();
        let id = mint_for(&amm, alice(), 100).await;
        manager.deposit(alice(), id, 50).await.unwrap();
        amm.accrue_fees(id, FeeAmounts::new(1_000u64, 0u64)).await.unwrap();

        // Alice and the vault each hold half of the position on the pool side.
        manager.deposit(alice(), id, 50).await.unwrap();
        assert_eq!(manager.fees_owed(alice(), id), FeeAmounts::new(500u64, 0u64));

        let collected = manager.collect_fees(alice(), id).await.unwrap();
        assert_eq!(collected, FeeAmounts::new(500u64, 0u64));
        assert_eq!(amm.fee_balance(alice()).await, collected);
        assert!(manager.fees_owed(alice(), id).is_zero());
        assert!(manager.position(id).unwrap().uncollected_fees.is_zero());
        assert_eq!(
            manager.event_log().of_type(CustodyEventType::FeesCollected).count(),
            1
        );
        manager.audit().unwrap();
    }

    #[tokio::test]
    async fn test_collect_with_nothing_owed() {
        let (mut manager, amm) = setup();
        let id = mint_for(&amm, alice(), 100).await;
        manager.deposit(alice(), id, 100).await.unwrap();

        let err = manager.collect_fees(alice(), id).await.unwrap_err();
        assert_eq!(err, CustodyError::NothingToCollect { owner: alice(), id });
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_collect_on_unknown_position() {
        let (mut manager, _amm) = setup();
        let id = PositionId::from(5u64);

        assert_eq!(
            manager.collect_fees(alice(), id).await.unwrap_err(),
            CustodyError::NotFound(id)
        );
        assert_eq!(
            manager.update_uncollected_fees(alice(), id).await.unwrap_err(),
            CustodyError::NotFound(id)
        );
    }

    #[tokio::test]
    async fn test_rejected_fee_push_books_nothing() {
        let (mut manager, amm) = setup();
        let id = mint_for(&amm, alice(), 128).await;
        manager.deposit(alice(), id, 128).await.unwrap();
        amm.accrue_fees(id, FeeAmounts::new(70u64, 7u64)).await.unwrap();

        let before = manager.position(id).unwrap().clone();
        let logged = manager.events().len();
        amm.fail_next_transfer(TransferError::Rejected("paused".into()))
            .await;

        let err = manager.collect_fees(alice(), id).await.unwrap_err();
        assert!(err.transfer_error().is_some());
        assert_eq!(manager.position(id).unwrap(), &before);
        assert_eq!(manager.events().len(), logged);
        assert!(amm.fee_balance(alice()).await.is_zero());
        manager.audit().unwrap();

        assert_eq!(
            manager.collect_fees(alice(), id).await.unwrap(),
            FeeAmounts::new(70u64, 7u64)
        );
        assert_eq!(amm.fee_balance(alice()).await, FeeAmounts::new(70u64, 7u64));
    }

    #[tokio::test]
    async fn test_short_fee_delivery_keeps_remainder_owed() {
        let amm = Arc::new(InMemoryAmm::new(Price::new(dec!(2000))));
        let token = Arc::new(HalfPayingToken(amm.clone()));
        let mut manager =
            PositionManager::new(owner(), vault(), token, amm.clone(), ManagerConfig::default()).unwrap();
        let id = mint_for(&amm, alice(), 128).await;
        manager.deposit(alice(), id, 128).await.unwrap();
        amm.accrue_fees(id, FeeAmounts::new(256u64, 64u64)).await.unwrap();

        let delivered = manager.collect_fees(alice(), id).await.unwrap();

        assert_eq!(delivered, FeeAmounts::new(128u64, 32u64));
        assert_eq!(amm.fee_balance(alice()).await, delivered);
        assert_eq!(manager.fees_owed(alice(), id), FeeAmounts::new(128u64, 32u64));
        assert_eq!(
            manager.position(id).unwrap().uncollected_fees,
            FeeAmounts::new(128u64, 32u64)
        );
        match &manager.events().last().unwrap().data {
            EventData::Fees(data) => {
                assert_eq!(data.fees, delivered);
                assert_eq!(data.uncollected, FeeAmounts::new(128u64, 32u64));
            }
            other => panic!("unexpected event data {other:?}"),
        }
        manager.audit().unwrap();

        // The pool and the registry agree on what is left.
        assert!(manager.update_uncollected_fees(alice(), id).await.unwrap().is_zero());
        assert_eq!(
            manager.collect_fees(alice(), id).await.unwrap(),
            FeeAmounts::new(64u64, 16u64)
        );
        manager.audit().unwrap();
    }

    #[tokio::test]
    async fn test_fees_survive_full_withdrawal_until_collected() {
        let (mut manager, amm) = setup();
        let id = mint_for(&amm, alice(), 128).await;
        manager.deposit(alice(), id, 128).await.unwrap();
        amm.accrue_fees(id, FeeAmounts::new(10u64, 0u64)).await.unwrap();

        manager.withdraw(alice(), id, 128).await.unwrap();
        // A claim on fees alone keeps the position registered.
        assert_eq!(manager.positions(), vec![id]);
        assert_eq!(manager.fees_owed(alice(), id), FeeAmounts::new(10u64, 0u64));

        manager.collect_fees(alice(), id).await.unwrap();
        assert!(manager.positions().is_empty());
        assert!(manager.shares_of(alice()).is_empty());
    }
}
