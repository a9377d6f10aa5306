use super::PositionManager;
use crate::error::CustodyError;
use lp_custody_domain::{FeeAmounts, Liquidity};
use tracing::{debug, error};

impl PositionManager {
    /// Checks that the registry and the ledger agree.
    ///
    /// For every position: its liquidity equals the outstanding share
    /// supply, the supply equals the sum of balances, and the fees owed to
    /// holders never exceed the uncollected fees. The external custody
    /// balance is not consulted.
    ///
    /// # Errors
    /// `AccountingInvariantViolation` describing the first mismatch.
    pub fn audit(&self) -> Result<(), CustodyError> {
        for (id, supply) in self.ledger.positions() {
            if !self.registry.contains(id) {
                return Err(violation(format!("position {id} has {supply} shares but is not registered")));
            }
        }

        for position in self.registry.iter() {
            let id = position.id;
            if position.custodian != self.registry.custodian() {
                return Err(violation(format!(
                    "position {id} is held by {} instead of {}",
                    position.custodian,
                    self.registry.custodian()
                )));
            }

            let supply = self.ledger.total_supply(id);
            if supply != position.liquidity_amount {
                return Err(violation(format!(
                    "position {id} holds {} liquidity against {supply} shares",
                    position.liquidity_amount
                )));
            }

            let mut balances: Liquidity = 0;
            let mut owed = FeeAmounts::zero();
            for share in self.ledger.holders(id) {
                balances = balances
                    .checked_add(share.balance)
                    .ok_or_else(|| violation(format!("balances of position {id} overflow")))?;

                let mut settled = share.clone();
                settled
                    .settle(position.fee_growth_per_share)
                    .ok_or_else(|| violation(format!("checkpoint of {} on {id} is ahead", share.owner)))?;
                owed = owed
                    .checked_add(settled.fees_owed)
                    .ok_or_else(|| violation(format!("fees owed on position {id} overflow")))?;
            }

            if balances != supply {
                return Err(violation(format!(
                    "balances of position {id} sum to {balances}, supply is {supply}"
                )));
            }
            if !position.uncollected_fees.covers(&owed) {
                return Err(violation(format!(
                    "holders of position {id} are owed {owed}, only {} uncollected",
                    position.uncollected_fees
                )));
            }
        }

        debug!(positions = self.registry.len(), "Audit passed");
        Ok(())
    }
}

fn violation(detail: String) -> CustodyError {
    error!(detail = %detail, "Accounting invariant violated");
    CustodyError::AccountingInvariantViolation(detail)
}
