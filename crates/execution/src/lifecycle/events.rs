//! Lifecycle events for custodied positions.

use lp_custody_domain::{Address, FeeAmounts, Liquidity, PositionId};
use serde::{Deserialize, Serialize};

/// Type of custody event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CustodyEventType {
    /// A previously unseen position entered custody.
    PositionRegistered,
    /// Liquidity was deposited and shares minted.
    Deposited,
    /// Shares were burned and liquidity released.
    Withdrawn,
    /// New pool fees were distributed to holders.
    FeesUpdated,
    /// Owed fees were sent to a holder.
    FeesCollected,
    /// A fully drained position was dropped from the registry.
    PositionReleased,
    /// The pool's observation buffer target was raised.
    ObservationCardinalityIncreased,
    /// The TWAP window was changed.
    TwapWindowChanged,
}

/// A custody event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustodyEvent {
    /// Event ID.
    pub id: String,
    /// Event type.
    pub event_type: CustodyEventType,
    /// Position concerned, if any.
    pub position_id: Option<PositionId>,
    /// Principal that triggered the event.
    pub account: Address,
    /// Timestamp.
    pub timestamp: chrono::DateTime<chrono::Utc>,
    /// Event-specific data.
    pub data: EventData,
}

impl CustodyEvent {
    /// Creates a new custody event.
    pub fn new(
        event_type: CustodyEventType,
        position_id: Option<PositionId>,
        account: Address,
        data: EventData,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            position_id,
            account,
            timestamp: chrono::Utc::now(),
            data,
        }
    }
}

/// Event-specific data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventData {
    /// Registration data.
    Registration(RegistrationData),
    /// Share balance change data.
    BalanceChange(BalanceChangeData),
    /// Fee movement data.
    Fees(FeesData),
    /// Oracle maintenance data.
    Maintenance(MaintenanceData),
    /// No payload.
    Empty,
}

/// Data for a position entering custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationData {
    /// Custodian now holding the position.
    pub custodian: Address,
    /// Liquidity at registration.
    pub liquidity: Liquidity,
}

/// Data for deposits and withdrawals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChangeData {
    /// Shares minted or burned.
    pub amount: Liquidity,
    /// Caller's balance after the change.
    pub resulting_balance: Liquidity,
    /// Position liquidity after the change.
    pub position_total: Liquidity,
}

/// Data for fee distribution and collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeesData {
    /// Fees distributed or collected.
    pub fees: FeeAmounts,
    /// Position's uncollected fees afterwards.
    pub uncollected: FeeAmounts,
}

/// Data for oracle maintenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaintenanceData {
    /// New observation cardinality target.
    ObservationCardinality(u16),
    /// New TWAP window in seconds.
    TwapWindow(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custody_event_creation() {
        let event = CustodyEvent::new(
            CustodyEventType::Deposited,
            Some(PositionId::from(7u64)),
            Address::from_low_u64_be(1),
            EventData::BalanceChange(BalanceChangeData {
                amount: 10,
                resulting_balance: 10,
                position_total: 10,
            }),
        );

        assert_eq!(event.event_type, CustodyEventType::Deposited);
        assert!(!event.id.is_empty());

        let json = serde_json::to_string(&event).unwrap();
        let back: CustodyEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.data, event.data);
        assert_eq!(back.position_id, event.position_id);
    }
}
