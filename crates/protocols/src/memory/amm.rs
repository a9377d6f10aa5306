use super::oracle::ObservationBuffer;
use crate::error::{OracleError, TransferError};
use crate::pool::{ObservationState, PoolOracle};
use crate::position_token::PositionToken;
use async_trait::async_trait;
use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId, Price, TokenAmount};
use primitive_types::{U256, U512};
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug)]
struct AmmState {
    next_id: u64,
    /// Balances per holder for every minted id.
    holdings: HashMap<PositionId, BTreeMap<Address, Liquidity>>,
    /// Fees owed per (id, holder), not yet collected.
    fees_owed: HashMap<(PositionId, Address), FeeAmounts>,
    /// Tokens received through `collect`.
    fee_balances: HashMap<Address, FeeAmounts>,
    /// (holder, operator) pairs.
    approvals: HashSet<(Address, Address)>,
    pending_failure: Option<ScriptedFailure>,
    skip_next_credit: bool,
    oracle: ObservationBuffer,
}

#[derive(Debug)]
struct ScriptedFailure {
    /// Calls still allowed through before `error` is returned.
    remaining: u32,
    error: TransferError,
}

impl AmmState {
    fn take_failure(&mut self) -> Option<TransferError> {
        match self.pending_failure.as_mut() {
            Some(failure) if failure.remaining > 0 => {
                failure.remaining -= 1;
                None
            }
            Some(_) => self.pending_failure.take().map(|f| f.error),
            None => None,
        }
    }
}

/// A concentrated-liquidity pool and its position token, kept in memory.
#[derive(Debug)]
pub struct InMemoryAmm {
    state: RwLock<AmmState>,
}

impl InMemoryAmm {
    /// Creates an empty pool quoting `price`, at time zero.
    #[must_use]
    pub fn new(price: Price) -> Self {
        Self {
            state: RwLock::new(AmmState {
                next_id: 1,
                holdings: HashMap::new(),
                fees_owed: HashMap::new(),
                fee_balances: HashMap::new(),
                approvals: HashSet::new(),
                pending_failure: None,
                skip_next_credit: false,
                oracle: ObservationBuffer::new(price.value),
            }),
        }
    }

    /// Mints a new position holding `liquidity` for `owner`.
    pub async fn mint_position(&self, owner: Address, liquidity: Liquidity) -> PositionId {
        let mut state = self.state.write().await;
        let id = PositionId::from(state.next_id);
        state.next_id += 1;
        state
            .holdings
            .entry(id)
            .or_default()
            .insert(owner, liquidity);

        debug!(position = %id, owner = %owner, liquidity, "Position minted");
        id
    }

    /// Lets `operator` move anything `owner` holds.
    pub async fn set_approval_for_all(&self, owner: Address, operator: Address, approved: bool) {
        let mut state = self.state.write().await;
        if approved {
            state.approvals.insert((owner, operator));
        } else {
            state.approvals.remove(&(owner, operator));
        }
    }

    /// Accrues `fees` on `id`, split over its holders by balance.
    pub async fn accrue_fees(&self, id: PositionId, fees: FeeAmounts) -> Result<(), OracleError> {
        let mut state = self.state.write().await;
        let holders: Vec<(Address, Liquidity)> = state
            .holdings
            .get(&id)
            .ok_or(OracleError::UnknownPosition(id))?
            .iter()
            .map(|(holder, balance)| (*holder, *balance))
            .collect();

        let total: Liquidity = holders.iter().map(|(_, b)| *b).sum();
        if total == 0 {
            return Ok(());
        }

        for (holder, balance) in holders {
            let part = FeeAmounts {
                amount0: pro_rata(fees.amount0, balance, total),
                amount1: pro_rata(fees.amount1, balance, total),
            };
            let owed = state.fees_owed.entry((id, holder)).or_default();
            *owed = owed.checked_add(part).ok_or_else(|| {
                OracleError::Unavailable(format!("fee overflow on position {id}"))
            })?;
        }
        Ok(())
    }

    /// Makes the next `transfer` or `collect` fail with `error`.
    pub async fn fail_next_transfer(&self, error: TransferError) {
        self.fail_transfer_after(0, error).await;
    }

    /// Lets `successes` calls to `transfer` or `collect` through, then fails
    /// the following one with `error`.
    pub async fn fail_transfer_after(&self, successes: u32, error: TransferError) {
        self.state.write().await.pending_failure = Some(ScriptedFailure {
            remaining: successes,
            error,
        });
    }

    /// Makes the next `transfer` report success without moving anything.
    pub async fn skip_next_credit(&self) {
        self.state.write().await.skip_next_credit = true;
    }

    /// Tokens `holder` has received through fee collection.
    pub async fn fee_balance(&self, holder: Address) -> FeeAmounts {
        self.state
            .read()
            .await
            .fee_balances
            .get(&holder)
            .copied()
            .unwrap_or_default()
    }

    /// Moves the clock forward, writing an observation at the new time.
    pub async fn advance_time(&self, secs: u64) {
        self.state.write().await.oracle.advance(secs);
    }

    /// Sets the spot price from the current time onwards.
    pub async fn set_price(&self, price: Price) {
        self.state.write().await.oracle.write(price.value);
    }

    pub async fn now(&self) -> u64 {
        self.state.read().await.oracle.now()
    }
}

fn pro_rata(amount: TokenAmount, part: Liquidity, total: Liquidity) -> TokenAmount {
    let scaled = amount.as_u256().full_mul(U256::from(part)) / U512::from(total);
    TokenAmount(U256::try_from(scaled).unwrap_or(U256::MAX))
}

#[async_trait]
impl PositionToken for InMemoryAmm {
    async fn transfer(
        &self,
        operator: Address,
        from: Address,
        to: Address,
        id: PositionId,
        amount: Liquidity,
    ) -> Result<(), TransferError> {
        let mut state = self.state.write().await;

        if let Some(error) = state.take_failure() {
            return Err(error);
        }
        if operator != from && !state.approvals.contains(&(from, operator)) {
            return Err(TransferError::NotApproved {
                owner: from,
                operator,
            });
        }

        let skip = std::mem::take(&mut state.skip_next_credit);
        let holders = state
            .holdings
            .get_mut(&id)
            .ok_or(TransferError::NonexistentToken { id })?;

        let available = holders.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(TransferError::InsufficientBalance {
                id,
                holder: from,
                available,
                requested: amount,
            });
        }
        if skip || amount == 0 {
            return Ok(());
        }

        if available == amount {
            holders.remove(&from);
        } else {
            holders.insert(from, available - amount);
        }
        *holders.entry(to).or_default() += amount;

        debug!(position = %id, from = %from, to = %to, amount, "Position transferred");
        Ok(())
    }

    async fn balance_of(&self, owner: Address, id: PositionId) -> Result<Liquidity, TransferError> {
        let state = self.state.read().await;
        let holders = state
            .holdings
            .get(&id)
            .ok_or(TransferError::NonexistentToken { id })?;
        Ok(holders.get(&owner).copied().unwrap_or(0))
    }

    async fn owner_of(&self, id: PositionId) -> Result<Address, TransferError> {
        let state = self.state.read().await;
        state
            .holdings
            .get(&id)
            .and_then(|holders| holders.iter().max_by_key(|(_, b)| **b))
            .map(|(holder, _)| *holder)
            .ok_or(TransferError::NonexistentToken { id })
    }

    async fn collect(
        &self,
        operator: Address,
        id: PositionId,
        recipient: Address,
        amounts: FeeAmounts,
    ) -> Result<FeeAmounts, TransferError> {
        let mut state = self.state.write().await;

        if let Some(error) = state.take_failure() {
            return Err(error);
        }
        if !state.holdings.contains_key(&id) {
            return Err(TransferError::NonexistentToken { id });
        }

        let owed = state
            .fees_owed
            .get(&(id, operator))
            .copied()
            .unwrap_or_default();
        let remaining = owed
            .checked_sub(amounts)
            .ok_or(TransferError::InsufficientFees {
                id,
                owed,
                requested: amounts,
            })?;
        state.fees_owed.insert((id, operator), remaining);

        let received = state.fee_balances.entry(recipient).or_default();
        *received = received
            .checked_add(amounts)
            .ok_or_else(|| TransferError::Rejected("fee balance overflow".to_string()))?;

        debug!(position = %id, recipient = %recipient, amounts = %amounts, "Fees collected");
        Ok(amounts)
    }
}

#[async_trait]
impl PoolOracle for InMemoryAmm {
    async fn current_price(&self) -> Result<Price, OracleError> {
        Ok(Price::new(self.state.read().await.oracle.current_price()))
    }

    async fn fees_owed(&self, id: PositionId, holder: Address) -> Result<FeeAmounts, OracleError> {
        let state = self.state.read().await;
        if !state.holdings.contains_key(&id) {
            return Err(OracleError::UnknownPosition(id));
        }
        Ok(state
            .fees_owed
            .get(&(id, holder))
            .copied()
            .unwrap_or_default())
    }

    async fn observation_state(&self) -> Result<ObservationState, OracleError> {
        let state = self.state.read().await;
        Ok(ObservationState {
            cardinality: state.oracle.cardinality(),
            cardinality_next: state.oracle.cardinality_next(),
            oldest_observation_secs: state.oracle.oldest_age(),
        })
    }

    async fn twap(&self, window_secs: u32) -> Result<Price, OracleError> {
        self.state.read().await.oracle.twap(window_secs).map(Price::new)
    }

    async fn increase_observation_cardinality_next(&self, cardinality: u16) -> Result<u16, OracleError> {
        Ok(self.state.write().await.oracle.grow(cardinality))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn user() -> Address {
        Address::from_low_u64_be(1)
    }

    fn vault() -> Address {
        Address::from_low_u64_be(99)
    }

    #[tokio::test]
    async fn test_transfer_unknown_id_is_rejected() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let err = amm
            .transfer(user(), user(), vault(), PositionId::from(22u64), 1)
            .await
            .unwrap_err();

        assert_eq!(err, TransferError::NonexistentToken { id: PositionId::from(22u64) });
        assert!(err.to_string().contains("nonexistent token"));
    }

    #[tokio::test]
    async fn test_transfer_requires_approval_for_third_party() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 100).await;

        let err = amm.transfer(vault(), user(), vault(), id, 10).await.unwrap_err();
        assert!(matches!(err, TransferError::NotApproved { .. }));

        amm.set_approval_for_all(user(), vault(), true).await;
        amm.transfer(vault(), user(), vault(), id, 10).await.unwrap();

        assert_eq!(amm.balance_of(user(), id).await.unwrap(), 90);
        assert_eq!(amm.balance_of(vault(), id).await.unwrap(), 10);
        assert_eq!(amm.owner_of(id).await.unwrap(), user());
    }

    #[tokio::test]
    async fn test_transfer_insufficient_balance() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 5).await;

        let err = amm.transfer(user(), user(), vault(), id, 6).await.unwrap_err();
        assert!(matches!(
            err,
            TransferError::InsufficientBalance { available: 5, requested: 6, .. }
        ));
        assert!(err.to_string().starts_with("balance too low for this id"));
    }

    #[tokio::test]
    async fn test_scripted_failure_is_consumed_once() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 5).await;
        amm.fail_next_transfer(TransferError::Rejected("paused".into())).await;

        let err = amm.transfer(user(), user(), vault(), id, 1).await.unwrap_err();
        assert_eq!(err.to_string(), "paused");
        amm.transfer(user(), user(), vault(), id, 1).await.unwrap();
    }

    #[tokio::test]
    async fn test_failure_after_successes() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 5).await;
        amm.fail_transfer_after(1, TransferError::Rejected("paused".into())).await;

        amm.transfer(user(), user(), vault(), id, 1).await.unwrap();
        assert!(amm.transfer(user(), user(), vault(), id, 1).await.is_err());
        amm.transfer(user(), user(), vault(), id, 1).await.unwrap();
        assert_eq!(amm.balance_of(vault(), id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_skip_next_credit_moves_nothing() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 5).await;
        amm.skip_next_credit().await;

        amm.transfer(user(), user(), vault(), id, 5).await.unwrap();
        assert_eq!(amm.balance_of(vault(), id).await.unwrap(), 0);
        assert_eq!(amm.balance_of(user(), id).await.unwrap(), 5);
    }

    #[tokio::test]
    async fn test_fees_accrue_pro_rata_and_collect() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        let id = amm.mint_position(user(), 75).await;
        amm.transfer(user(), user(), vault(), id, 25).await.unwrap();

        amm.accrue_fees(id, FeeAmounts::new(400u64, 40u64)).await.unwrap();
        assert_eq!(amm.fees_owed(id, vault()).await.unwrap(), FeeAmounts::new(100u64, 10u64));
        assert_eq!(amm.fees_owed(id, user()).await.unwrap(), FeeAmounts::new(300u64, 30u64));

        let err = amm
            .collect(vault(), id, user(), FeeAmounts::new(101u64, 0u64))
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InsufficientFees { .. }));

        amm.collect(vault(), id, user(), FeeAmounts::new(60u64, 10u64)).await.unwrap();
        assert_eq!(amm.fees_owed(id, vault()).await.unwrap(), FeeAmounts::new(40u64, 0u64));
        assert_eq!(amm.fee_balance(user()).await, FeeAmounts::new(60u64, 10u64));
    }

    #[tokio::test]
    async fn test_oracle_warm_up() {
        let amm = InMemoryAmm::new(Price::new(dec!(2)));
        assert_eq!(amm.increase_observation_cardinality_next(100).await.unwrap(), 100);
        amm.advance_time(3600).await;

        let obs = amm.observation_state().await.unwrap();
        assert_eq!(obs.cardinality, 100);
        assert_eq!(obs.oldest_observation_secs, 3600);
        assert_eq!(amm.twap(3600).await.unwrap(), Price::new(dec!(2)));
        assert_eq!(amm.now().await, 3600);
    }
}
