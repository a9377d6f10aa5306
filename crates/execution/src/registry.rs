//! Registry of custodied positions.
//!
//! Records, per position id, the custodian holding it, its last known
//! liquidity and the fees distributed to its holders. Only the position
//! manager mutates it.

use crate::error::CustodyError;
use lp_custody_domain::{Address, FeeAmounts, FeeGrowth, Liquidity, Position, PositionId};
use std::collections::BTreeMap;
use tracing::debug;

/// Signed change to a position's liquidity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiquidityDelta {
    /// Liquidity added to custody.
    Increase(Liquidity),
    /// Liquidity released from custody.
    Decrease(Liquidity),
}

/// Registry of positions held by one custodian.
#[derive(Debug, Clone)]
pub struct PositionRegistry {
    /// Principal holding every registered position.
    custodian: Address,
    /// Positions by id.
    positions: BTreeMap<PositionId, Position>,
}

impl PositionRegistry {
    /// Creates an empty registry for `custodian`.
    #[must_use]
    pub fn new(custodian: Address) -> Self {
        Self {
            custodian,
            positions: BTreeMap::new(),
        }
    }

    /// Principal holding every registered position.
    pub fn custodian(&self) -> Address {
        self.custodian
    }

    /// Registers a position that is not currently backed.
    ///
    /// A record left with no liquidity and no fees is reused, keeping its
    /// fee growth so existing checkpoints stay valid.
    ///
    /// # Errors
    /// `AlreadyRegistered` if the id is still backed; use
    /// [`register_or_adjust`](Self::register_or_adjust) to top it up.
    pub fn register(&mut self, id: PositionId, liquidity_amount: Liquidity) -> Result<&Position, CustodyError> {
        let custodian = self.custodian;
        let position = self
            .positions
            .entry(id)
            .or_insert_with(|| Position::new(id, custodian, 0));

        if position.liquidity_amount > 0 || !position.uncollected_fees.is_zero() {
            return Err(CustodyError::AlreadyRegistered {
                id,
                custodian: position.custodian,
            });
        }
        position.liquidity_amount = liquidity_amount;

        debug!(position = %id, liquidity = liquidity_amount, "Position registered");
        Ok(position)
    }

    /// Registers `id` or tops it up by `amount`. Returns the new liquidity.
    pub fn register_or_adjust(&mut self, id: PositionId, amount: Liquidity) -> Result<Liquidity, CustodyError> {
        if self.positions.contains_key(&id) {
            self.adjust(id, LiquidityDelta::Increase(amount))
        } else {
            self.register(id, amount).map(|p| p.liquidity_amount)
        }
    }

    /// Checks that `register_or_adjust(id, amount)` would succeed.
    pub fn can_increase(&self, id: PositionId, amount: Liquidity) -> Result<(), CustodyError> {
        let current = self.positions.get(&id).map_or(0, |p| p.liquidity_amount);
        current
            .checked_add(amount)
            .map(|_| ())
            .ok_or(CustodyError::Overflow("increasing position liquidity"))
    }

    /// Applies `delta` to the liquidity of `id`. Returns the new liquidity.
    pub fn adjust(&mut self, id: PositionId, delta: LiquidityDelta) -> Result<Liquidity, CustodyError> {
        let position = self.get_mut(id)?;
        let current = position.liquidity_amount;

        let updated = match delta {
            LiquidityDelta::Increase(amount) => current
                .checked_add(amount)
                .ok_or(CustodyError::Overflow("increasing position liquidity"))?,
            LiquidityDelta::Decrease(amount) => {
                current.checked_sub(amount).ok_or(CustodyError::Underflow {
                    id,
                    available: current,
                    requested: amount,
                })?
            }
        };
        position.liquidity_amount = updated;
        Ok(updated)
    }

    /// Adds freshly distributed fees and the growth they represent.
    pub fn record_fees(
        &mut self,
        id: PositionId,
        fees: FeeAmounts,
        growth: FeeGrowth,
    ) -> Result<&Position, CustodyError> {
        let position = self.get_mut(id)?;
        let uncollected = position
            .uncollected_fees
            .checked_add(fees)
            .ok_or(CustodyError::Overflow("recording fees"))?;
        let growth = position
            .fee_growth_per_share
            .checked_add(growth)
            .ok_or(CustodyError::Overflow("accumulating fee growth"))?;

        position.uncollected_fees = uncollected;
        position.fee_growth_per_share = growth;
        Ok(position)
    }

    /// Checks that `record_fees(id, fees, growth)` would succeed.
    pub fn can_record_fees(&self, id: PositionId, fees: FeeAmounts, growth: FeeGrowth) -> Result<(), CustodyError> {
        let position = self.get(id)?;
        position
            .uncollected_fees
            .checked_add(fees)
            .ok_or(CustodyError::Overflow("recording fees"))?;
        position
            .fee_growth_per_share
            .checked_add(growth)
            .ok_or(CustodyError::Overflow("accumulating fee growth"))?;
        Ok(())
    }

    /// Removes collected fees from the uncollected total.
    pub fn release_fees(&mut self, id: PositionId, fees: FeeAmounts) -> Result<FeeAmounts, CustodyError> {
        let position = self.get_mut(id)?;
        let remaining = position.uncollected_fees.checked_sub(fees).ok_or_else(|| {
            CustodyError::AccountingInvariantViolation(format!(
                "releasing {fees} from position {id} with {} uncollected",
                position.uncollected_fees
            ))
        })?;
        position.uncollected_fees = remaining;
        Ok(remaining)
    }

    /// Record of `id`.
    pub fn get(&self, id: PositionId) -> Result<&Position, CustodyError> {
        self.positions.get(&id).ok_or(CustodyError::NotFound(id))
    }

    /// Whether `id` has a record, backed or not.
    pub fn contains(&self, id: PositionId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Liquidity held in custody for `id`.
    pub fn liquidity(&self, id: PositionId) -> Result<Liquidity, CustodyError> {
        self.get(id).map(|p| p.liquidity_amount)
    }

    /// Cumulative fee growth per share of `id`; zero if unregistered.
    pub fn fee_growth(&self, id: PositionId) -> FeeGrowth {
        self.positions
            .get(&id)
            .map(|p| p.fee_growth_per_share)
            .unwrap_or_default()
    }

    /// Registered ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = PositionId> + '_ {
        self.positions.keys().copied()
    }

    /// Records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether no position is registered.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Drops the record of `id`.
    pub fn remove(&mut self, id: PositionId) -> Option<Position> {
        self.positions.remove(&id)
    }

    /// Puts back the record of `id` saved by an earlier `get`, or drops it
    /// if there was none.
    pub fn restore(&mut self, id: PositionId, saved: Option<Position>) {
        match saved {
            Some(position) => {
                self.positions.insert(id, position);
            }
            None => {
                self.positions.remove(&id);
            }
        }
    }

    fn get_mut(&mut self, id: PositionId) -> Result<&mut Position, CustodyError> {
        self.positions.get_mut(&id).ok_or(CustodyError::NotFound(id))
    }
}
