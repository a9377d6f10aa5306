//! Share ledger.
//!
//! Maps (owner, position) to a fungible balance drawn against the position,
//! plus the fees settled to that claim. Every balance change settles fees
//! first so a claim only earns on growth accrued while it held the balance.

use crate::error::CustodyError;
use lp_custody_domain::{Address, FeeAmounts, FeeGrowth, Liquidity, PositionId, Share};
use std::collections::{BTreeMap, HashMap};

/// Saved state of one claim and its position's supply.
///
/// Restoring it undoes every ledger change made to that claim since it was
/// taken, provided no other claim on the position changed in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSnapshot {
    owner: Address,
    id: PositionId,
    share: Option<Share>,
    total: Liquidity,
}

/// Ledger of share balances across all positions.
#[derive(Debug, Clone, Default)]
pub struct ShareLedger {
    /// Claims keyed by position first, so a position's holders are contiguous.
    shares: BTreeMap<(PositionId, Address), Share>,
    /// Outstanding share supply per position.
    totals: HashMap<PositionId, Liquidity>,
}

impl ShareLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` shares of `id` to `owner`. Returns the new balance.
    ///
    /// `growth` is the position's current fee growth; it seeds the checkpoint
    /// of a new claim and settles an existing one.
    pub fn mint(
        &mut self,
        owner: Address,
        id: PositionId,
        amount: Liquidity,
        growth: FeeGrowth,
    ) -> Result<Liquidity, CustodyError> {
        self.can_mint(owner, id, amount)?;

        let mut share = self.settled(owner, id, growth)?;
        share.balance += amount;
        let balance = share.balance;

        self.shares.insert((id, owner), share);
        *self.totals.entry(id).or_default() += amount;
        Ok(balance)
    }

    /// Checks that `mint(owner, id, amount, _)` would succeed.
    pub fn can_mint(&self, owner: Address, id: PositionId, amount: Liquidity) -> Result<(), CustodyError> {
        if amount == 0 {
            return Err(CustodyError::InvalidAmount);
        }
        self.total_supply(id)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow("minting shares"))?;
        self.balance_of(owner, id)
            .checked_add(amount)
            .ok_or(CustodyError::Overflow("minting shares"))?;
        Ok(())
    }

    /// Debits `amount` shares of `id` from `owner`. Returns the new balance.
    pub fn burn(
        &mut self,
        owner: Address,
        id: PositionId,
        amount: Liquidity,
        growth: FeeGrowth,
    ) -> Result<Liquidity, CustodyError> {
        if amount == 0 {
            return Err(CustodyError::InvalidAmount);
        }
        let available = self.balance_of(owner, id);
        if amount > available {
            return Err(CustodyError::InsufficientBalance {
                owner,
                id,
                available,
                requested: amount,
            });
        }
        let total = self.total_supply(id);
        let remaining_total = total.checked_sub(amount).ok_or_else(|| {
            CustodyError::AccountingInvariantViolation(format!(
                "position {id} supply {total} is below a single balance of {available}"
            ))
        })?;

        let mut share = self.settled(owner, id, growth)?;
        share.balance -= amount;
        let balance = share.balance;

        self.store(share);
        if remaining_total == 0 {
            self.totals.remove(&id);
        } else {
            self.totals.insert(id, remaining_total);
        }
        Ok(balance)
    }

    /// Settles fees of `owner`'s claim on `id`. Returns the fees owed.
    pub fn settle(&mut self, owner: Address, id: PositionId, growth: FeeGrowth) -> Result<FeeAmounts, CustodyError> {
        if !self.shares.contains_key(&(id, owner)) {
            return Ok(FeeAmounts::zero());
        }
        let share = self.settled(owner, id, growth)?;
        let owed = share.fees_owed;
        self.store(share);
        Ok(owed)
    }

    /// Zeroes the fees owed to `owner` on `id`, returning them.
    pub fn take_fees(&mut self, owner: Address, id: PositionId) -> FeeAmounts {
        let Some(share) = self.shares.get_mut(&(id, owner)) else {
            return FeeAmounts::zero();
        };
        let owed = std::mem::take(&mut share.fees_owed);
        if share.is_empty() {
            self.shares.remove(&(id, owner));
        }
        owed
    }

    /// Gives back fees taken by [`take_fees`](Self::take_fees).
    pub fn restore_fees(
        &mut self,
        owner: Address,
        id: PositionId,
        fees: FeeAmounts,
        growth: FeeGrowth,
    ) -> Result<(), CustodyError> {
        let share = self
            .shares
            .entry((id, owner))
            .or_insert_with(|| Share::new(owner, id, growth));
        share.fees_owed = share
            .fees_owed
            .checked_add(fees)
            .ok_or(CustodyError::Overflow("restoring fees"))?;
        Ok(())
    }

    /// Saves `owner`'s claim on `id` for a later [`restore`](Self::restore).
    pub fn snapshot(&self, owner: Address, id: PositionId) -> ClaimSnapshot {
        ClaimSnapshot {
            owner,
            id,
            share: self.shares.get(&(id, owner)).cloned(),
            total: self.total_supply(id),
        }
    }

    /// Puts a claim and its position's supply back as they were.
    pub fn restore(&mut self, snapshot: ClaimSnapshot) {
        let key = (snapshot.id, snapshot.owner);
        match snapshot.share {
            Some(share) => {
                self.shares.insert(key, share);
            }
            None => {
                self.shares.remove(&key);
            }
        }
        if snapshot.total == 0 {
            self.totals.remove(&snapshot.id);
        } else {
            self.totals.insert(snapshot.id, snapshot.total);
        }
    }

    /// Shares of `id` held by `owner`.
    pub fn balance_of(&self, owner: Address, id: PositionId) -> Liquidity {
        self.shares.get(&(id, owner)).map_or(0, |s| s.balance)
    }

    /// Shares of `id` outstanding across all owners.
    pub fn total_supply(&self, id: PositionId) -> Liquidity {
        self.totals.get(&id).copied().unwrap_or(0)
    }

    pub fn share(&self, owner: Address, id: PositionId) -> Option<&Share> {
        self.shares.get(&(id, owner))
    }

    /// Claims held by `owner`, by ascending position id.
    pub fn shares_of(&self, owner: Address) -> impl Iterator<Item = &Share> {
        self.shares.values().filter(move |s| s.owner == owner)
    }

    /// Claims drawn against `id`.
    pub fn holders(&self, id: PositionId) -> impl Iterator<Item = &Share> {
        self.shares
            .range((id, Address::ZERO)..=(id, Address::MAX))
            .map(|(_, share)| share)
    }

    /// Whether any claim, even one holding only fees, references `id`.
    pub fn has_claims(&self, id: PositionId) -> bool {
        self.holders(id).next().is_some()
    }

    /// Positions with outstanding supply.
    pub fn positions(&self) -> impl Iterator<Item = (PositionId, Liquidity)> + '_ {
        self.totals.iter().map(|(id, total)| (*id, *total))
    }

    fn settled(&self, owner: Address, id: PositionId, growth: FeeGrowth) -> Result<Share, CustodyError> {
        let mut share = self
            .shares
            .get(&(id, owner))
            .cloned()
            .unwrap_or_else(|| Share::new(owner, id, growth));
        share.settle(growth).ok_or_else(|| {
            CustodyError::AccountingInvariantViolation(format!(
                "fee checkpoint of {owner} on position {id} is ahead of the position"
            ))
        })?;
        Ok(share)
    }

    fn store(&mut self, share: Share) {
        let key = (share.position_id, share.owner);
        if share.is_empty() {
            self.shares.remove(&key);
        } else {
            self.shares.insert(key, share);
        }
    }
}
