use super::PositionManager;
use crate::error::CustodyError;
use crate::lifecycle::MaintenanceData;
use lp_custody_domain::{Address, Price};
use tracing::debug;

impl PositionManager {
    /// Raises the number of observations the pool retains. Owner only.
    /// Returns the pool's resulting target.
    pub async fn increase_observation_cardinality(
        &mut self,
        caller: Address,
        cardinality: u16,
    ) -> Result<u16, CustodyError> {
        self.ensure_owner(caller, "increase observation cardinality")?;

        let target = self
            .pool
            .increase_observation_cardinality_next(cardinality)
            .await?;
        self.events
            .record_maintenance(caller, MaintenanceData::ObservationCardinality(target));
        Ok(target)
    }

    /// Changes the window [`twap`](Self::twap) averages over. Owner only.
    pub fn set_twap_window(&mut self, caller: Address, window_secs: u32) -> Result<(), CustodyError> {
        self.ensure_owner(caller, "set the twap window")?;
        if window_secs == 0 {
            return Err(CustodyError::InvalidConfig(
                "twap window must be greater than zero".to_string(),
            ));
        }

        self.config.twap_window_secs = window_secs;
        self.events
            .record_maintenance(caller, MaintenanceData::TwapWindow(window_secs));
        Ok(())
    }

    /// Time-weighted average price over the configured window.
    ///
    /// # Errors
    /// `OracleNotReady` until the pool retains enough observations covering
    /// the whole window.
    pub async fn twap(&self) -> Result<Price, CustodyError> {
        let state = self.pool.observation_state().await?;
        let required = self.config.min_observation_cardinality;
        let window_secs = self.config.twap_window_secs;

        if state.cardinality < required || state.oldest_observation_secs < u64::from(window_secs) {
            debug!(
                cardinality = state.cardinality,
                required,
                history_secs = state.oldest_observation_secs,
                window_secs,
                "Oracle not warmed up"
            );
            return Err(CustodyError::OracleNotReady {
                cardinality: state.cardinality,
                required,
                history_secs: state.oldest_observation_secs,
                window_secs,
            });
        }

        Ok(self.pool.twap(window_secs).await?)
    }

    /// Current pool price.
    pub async fn current_price(&self) -> Result<Price, CustodyError> {
        Ok(self.pool.current_price().await?)
    }
}
