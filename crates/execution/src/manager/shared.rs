use super::{PositionManager, WithdrawReceipt};
use crate::error::CustodyError;
use crate::lifecycle::CustodyEvent;
use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId, Price};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cloneable handle serializing access to one [`PositionManager`].
///
/// The lock is held for the whole operation, external awaits included, so
/// requests from concurrent tasks never interleave.
#[derive(Clone)]
pub struct SharedPositionManager {
    inner: Arc<Mutex<PositionManager>>,
}

impl SharedPositionManager {
    /// Wraps `manager`.
    pub fn new(manager: PositionManager) -> Self {
        Self {
            inner: Arc::new(Mutex::new(manager)),
        }
    }

    pub async fn deposit(&self, caller: Address, id: PositionId, amount: Liquidity) -> Result<Liquidity, CustodyError> {
        self.inner.lock().await.deposit(caller, id, amount).await
    }

    pub async fn withdraw(&self, caller: Address, id: PositionId, amount: Liquidity) -> Result<Liquidity, CustodyError> {
        self.inner.lock().await.withdraw(caller, id, amount).await
    }

    pub async fn deposit_many(
        &self,
        caller: Address,
        items: &[(PositionId, Liquidity)],
    ) -> Result<Vec<Liquidity>, CustodyError> {
        self.inner.lock().await.deposit_many(caller, items).await
    }

    pub async fn withdraw_all(&self, caller: Address) -> Result<Vec<WithdrawReceipt>, CustodyError> {
        self.inner.lock().await.withdraw_all(caller).await
    }

    pub async fn update_uncollected_fees(&self, caller: Address, id: PositionId) -> Result<FeeAmounts, CustodyError> {
        self.inner.lock().await.update_uncollected_fees(caller, id).await
    }

    pub async fn collect_fees(&self, caller: Address, id: PositionId) -> Result<FeeAmounts, CustodyError> {
        self.inner.lock().await.collect_fees(caller, id).await
    }

    pub async fn increase_observation_cardinality(&self, caller: Address, cardinality: u16) -> Result<u16, CustodyError> {
        self.inner
            .lock()
            .await
            .increase_observation_cardinality(caller, cardinality)
            .await
    }

    pub async fn set_twap_window(&self, caller: Address, window_secs: u32) -> Result<(), CustodyError> {
        self.inner.lock().await.set_twap_window(caller, window_secs)
    }

    pub async fn twap(&self) -> Result<Price, CustodyError> {
        self.inner.lock().await.twap().await
    }

    pub async fn current_price(&self) -> Result<Price, CustodyError> {
        self.inner.lock().await.current_price().await
    }

    pub async fn balance_of(&self, owner: Address, id: PositionId) -> Liquidity {
        self.inner.lock().await.balance_of(owner, id)
    }

    pub async fn position_total(&self, id: PositionId) -> Liquidity {
        self.inner.lock().await.position_total(id)
    }

    pub async fn positions(&self) -> Vec<PositionId> {
        self.inner.lock().await.positions()
    }

    /// Copy of the event log as of this call.
    pub async fn events(&self) -> Vec<CustodyEvent> {
        self.inner.lock().await.events().to_vec()
    }

    pub async fn audit(&self) -> Result<(), CustodyError> {
        self.inner.lock().await.audit()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;

    #[tokio::test]
    async fn test_concurrent_deposits_are_serialized() {
        let (manager, amm) = setup();
        let id = mint_for(&amm, alice(), 1_000).await;
        let shared = manager.into_shared();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move { shared.deposit(alice(), id, 10).await }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 10);
        }

        assert_eq!(shared.balance_of(alice(), id).await, 100);
        assert_eq!(shared.position_total(id).await, 100);
        shared.audit().await.unwrap();
    }
}
