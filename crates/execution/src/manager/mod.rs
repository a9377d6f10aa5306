//! Deposit/withdraw controller.
//!
//! [`PositionManager`] is the only writer of the registry and the ledger.
//! Every mutating operation takes `&mut self` and runs to completion,
//! external calls included, before the next one starts; wrap the manager in
//! a [`SharedPositionManager`] to serve concurrent tasks.
//!
//! External call ordering:
//! - Deposits pull the asset into custody before booking anything
//! - Withdrawals and fee collection book against a `Checkpoint` before the
//!   push and roll back to it if the push fails
//!
//! Events are recorded only once an operation commits.

mod audit;
mod deposit;
mod fees;
mod oracle;
mod shared;
mod withdraw;

pub use shared::SharedPositionManager;

use crate::config::ManagerConfig;
use crate::error::CustodyError;
use crate::gateway::CustodyGateway;
use crate::ledger::{ClaimSnapshot, ShareLedger};
use crate::lifecycle::{CustodyEvent, EventLog};
use crate::registry::PositionRegistry;
use lp_custody_domain::{Address, FeeAmounts, Liquidity, Position, PositionId, Share};
use lp_custody_protocols::{PoolOracle, PositionToken};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Outcome of one withdrawal in a [`PositionManager::withdraw_all`] sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Position released from.
    pub position_id: PositionId,
    /// Liquidity released to the caller.
    pub amount: Liquidity,
}

/// Registry record and caller claim as they were before an operation.
struct Checkpoint {
    id: PositionId,
    position: Option<Position>,
    claim: ClaimSnapshot,
}

/// Custodial manager of externally minted liquidity positions.
pub struct PositionManager {
    /// Privileged owner, fixed at construction.
    owner: Address,
    /// Registered positions.
    registry: PositionRegistry,
    /// Share balances.
    ledger: ShareLedger,
    /// Bridge to the position token.
    gateway: CustodyGateway,
    /// Pool state and price oracle.
    pool: Arc<dyn PoolOracle>,
    /// Committed transitions.
    events: EventLog,
    /// Configuration.
    config: ManagerConfig,
}

impl PositionManager {
    /// Creates a manager owned by `owner` that holds positions as `custodian`.
    ///
    /// # Errors
    /// `InvalidConfig` if `config` does not validate.
    pub fn new(
        owner: Address,
        custodian: Address,
        token: Arc<dyn PositionToken>,
        pool: Arc<dyn PoolOracle>,
        config: ManagerConfig,
    ) -> Result<Self, CustodyError> {
        config
            .validate()
            .map_err(|e| CustodyError::InvalidConfig(e.to_string()))?;

        info!(
            owner = %owner,
            custodian = %custodian,
            twap_window_secs = config.twap_window_secs,
            min_observation_cardinality = config.min_observation_cardinality,
            "Position manager created"
        );

        Ok(Self {
            owner,
            registry: PositionRegistry::new(custodian),
            ledger: ShareLedger::new(),
            gateway: CustodyGateway::new(custodian, token),
            pool,
            events: EventLog::new(),
            config,
        })
    }

    /// Wraps the manager for use from concurrent tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedPositionManager {
        SharedPositionManager::new(self)
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn custodian(&self) -> Address {
        self.registry.custodian()
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Shares of `id` held by `owner`.
    pub fn balance_of(&self, owner: Address, id: PositionId) -> Liquidity {
        self.ledger.balance_of(owner, id)
    }

    /// Liquidity held in custody for `id`; zero if it is not registered.
    pub fn position_total(&self, id: PositionId) -> Liquidity {
        self.registry.liquidity(id).unwrap_or(0)
    }

    /// Registry record of `id`.
    pub fn position(&self, id: PositionId) -> Result<&Position, CustodyError> {
        self.registry.get(id)
    }

    /// Registered ids in ascending order.
    pub fn positions(&self) -> Vec<PositionId> {
        self.registry.ids().collect()
    }

    /// Claims held by `owner`, by ascending position id.
    pub fn shares_of(&self, owner: Address) -> Vec<Share> {
        self.ledger.shares_of(owner).cloned().collect()
    }

    /// Fees `owner` could collect on `id` given the fees distributed so far.
    ///
    /// Does not read the pool; call
    /// [`update_uncollected_fees`](Self::update_uncollected_fees) first to
    /// include fees accrued since the last distribution.
    pub fn fees_owed(&self, owner: Address, id: PositionId) -> FeeAmounts {
        let growth = self.registry.fee_growth(id);
        self.ledger
            .share(owner, id)
            .and_then(|share| {
                let mut share = share.clone();
                share.settle(growth).map(|_| share.fees_owed)
            })
            .unwrap_or_default()
    }

    /// Committed transitions, oldest first.
    pub fn events(&self) -> &[CustodyEvent] {
        self.events.events()
    }

    pub fn event_log(&self) -> &EventLog {
        &self.events
    }

    /// Saves the state an operation by `caller` on `id` may touch.
    fn checkpoint(&self, caller: Address, id: PositionId) -> Checkpoint {
        Checkpoint {
            id,
            position: self.registry.get(id).ok().cloned(),
            claim: self.ledger.snapshot(caller, id),
        }
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        let Checkpoint { id, position, claim } = checkpoint;
        self.registry.restore(id, position);
        self.ledger.restore(claim);
    }

    fn ensure_owner(&self, caller: Address, action: &'static str) -> Result<(), CustodyError> {
        if caller != self.owner {
            return Err(CustodyError::Unauthorized { caller, action });
        }
        Ok(())
    }
}
