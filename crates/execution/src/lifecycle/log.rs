//! Append-only log of custody events.

use super::{
    BalanceChangeData, CustodyEvent, CustodyEventType, EventData, FeesData, MaintenanceData,
    RegistrationData,
};
use lp_custody_domain::{Address, PositionId};
use tracing::{debug, info};

/// Records every committed transition of the position manager.
///
/// Owned by the manager and only written while it holds exclusive access,
/// so events appear in commit order.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    /// Events in commit order.
    events: Vec<CustodyEvent>,
}

impl EventLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a position entering custody.
    pub fn record_registered(&mut self, position: PositionId, account: Address, data: RegistrationData) {
        info!(
            position = %position,
            custodian = %data.custodian,
            liquidity = data.liquidity,
            "Position registered"
        );
        self.push(CustodyEventType::PositionRegistered, Some(position), account, EventData::Registration(data));
    }

    /// Records a deposit.
    pub fn record_deposit(&mut self, position: PositionId, account: Address, data: BalanceChangeData) {
        info!(
            position = %position,
            account = %account,
            amount = data.amount,
            balance = data.resulting_balance,
            total = data.position_total,
            "Deposited"
        );
        self.push(CustodyEventType::Deposited, Some(position), account, EventData::BalanceChange(data));
    }

    /// Records a withdrawal.
    pub fn record_withdrawal(&mut self, position: PositionId, account: Address, data: BalanceChangeData) {
        info!(
            position = %position,
            account = %account,
            amount = data.amount,
            balance = data.resulting_balance,
            total = data.position_total,
            "Withdrawn"
        );
        self.push(CustodyEventType::Withdrawn, Some(position), account, EventData::BalanceChange(data));
    }

    /// Records fees distributed to holders.
    pub fn record_fees_updated(&mut self, position: PositionId, account: Address, data: FeesData) {
        debug!(
            position = %position,
            fees = %data.fees,
            uncollected = %data.uncollected,
            "Fees distributed"
        );
        self.push(CustodyEventType::FeesUpdated, Some(position), account, EventData::Fees(data));
    }

    /// Records fees sent to a holder.
    pub fn record_fees_collected(&mut self, position: PositionId, account: Address, data: FeesData) {
        info!(
            position = %position,
            account = %account,
            fees = %data.fees,
            "Fees collected"
        );
        self.push(CustodyEventType::FeesCollected, Some(position), account, EventData::Fees(data));
    }

    /// Records a drained position leaving the registry.
    pub fn record_released(&mut self, position: PositionId, account: Address) {
        debug!(position = %position, "Position released");
        self.push(CustodyEventType::PositionReleased, Some(position), account, EventData::Empty);
    }

    /// Records oracle maintenance by the owner.
    pub fn record_maintenance(&mut self, account: Address, data: MaintenanceData) {
        let event_type = match data {
            MaintenanceData::ObservationCardinality(cardinality) => {
                info!(cardinality, "Observation cardinality increased");
                CustodyEventType::ObservationCardinalityIncreased
            }
            MaintenanceData::TwapWindow(window_secs) => {
                info!(window_secs, "TWAP window changed");
                CustodyEventType::TwapWindowChanged
            }
        };
        self.push(event_type, None, account, EventData::Maintenance(data));
    }

    /// All events, oldest first.
    pub fn events(&self) -> &[CustodyEvent] {
        &self.events
    }

    /// Events concerning `position`, oldest first.
    pub fn for_position(&self, position: PositionId) -> impl Iterator<Item = &CustodyEvent> {
        self.events
            .iter()
            .filter(move |e| e.position_id == Some(position))
    }

    /// Events of `event_type`, oldest first.
    pub fn of_type(&self, event_type: CustodyEventType) -> impl Iterator<Item = &CustodyEvent> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Last event recorded.
    pub fn last(&self) -> Option<&CustodyEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn push(
        &mut self,
        event_type: CustodyEventType,
        position: Option<PositionId>,
        account: Address,
        data: EventData,
    ) {
        self.events
            .push(CustodyEvent::new(event_type, position, account, data));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balance_change(amount: u128) -> BalanceChangeData {
        BalanceChangeData {
            amount,
            resulting_balance: amount,
            position_total: amount,
        }
    }

    #[test]
    fn test_events_kept_in_order_and_filtered() {
        let mut log = EventLog::new();
        let user = Address::from_low_u64_be(1);
        let a = PositionId::from(1u64);
        let b = PositionId::from(2u64);

        log.record_deposit(a, user, balance_change(5));
        log.record_deposit(b, user, balance_change(6));
        log.record_withdrawal(a, user, balance_change(0));
        log.record_maintenance(user, MaintenanceData::TwapWindow(600));

        assert_eq!(log.len(), 4);
        assert_eq!(log.for_position(a).count(), 2);
        assert_eq!(log.of_type(CustodyEventType::Deposited).count(), 2);
        assert_eq!(
            log.last().map(|e| e.event_type),
            Some(CustodyEventType::TwapWindowChanged)
        );
        assert_eq!(log.events()[1].position_id, Some(b));
    }
}
