use crate::error::OracleError;
use async_trait::async_trait;
use lp_custody_domain::{Address, FeeAmounts, PositionId, Price};
use serde::{Deserialize, Serialize};

/// Snapshot of the pool's observation buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationState {
    /// Observations currently retained.
    pub cardinality: u16,
    /// Size the buffer grows to as new observations are written.
    pub cardinality_next: u16,
    /// Age in seconds of the oldest retained observation.
    pub oldest_observation_secs: u64,
}

/// Read side of the AMM pool plus its time-weighted average price oracle.
#[async_trait]
pub trait PoolOracle: Send + Sync {
    async fn current_price(&self) -> Result<Price, OracleError>;

    /// Fees accrued to `holder`'s part of position `id`, not yet collected.
    async fn fees_owed(&self, id: PositionId, holder: Address) -> Result<FeeAmounts, OracleError>;

    async fn observation_state(&self) -> Result<ObservationState, OracleError>;

    /// Average price over the last `window_secs` seconds.
    async fn twap(&self, window_secs: u32) -> Result<Price, OracleError>;

    /// Grows the observation buffer target. Returns the resulting target.
    async fn increase_observation_cardinality_next(&self, cardinality: u16) -> Result<u16, OracleError>;
}
