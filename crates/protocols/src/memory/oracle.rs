use crate::error::OracleError;
use rust_decimal::Decimal;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy)]
struct Observation {
    timestamp: u64,
    price_cumulative: Decimal,
    /// Price in effect from `timestamp` until the next observation.
    price: Decimal,
}

/// Ring of price observations, grown on write like a pool oracle.
#[derive(Debug)]
pub(crate) struct ObservationBuffer {
    now: u64,
    observations: VecDeque<Observation>,
    cardinality: u16,
    cardinality_next: u16,
}

impl ObservationBuffer {
    pub(crate) fn new(price: Decimal) -> Self {
        let mut observations = VecDeque::new();
        observations.push_back(Observation {
            timestamp: 0,
            price_cumulative: Decimal::ZERO,
            price,
        });
        Self {
            now: 0,
            observations,
            cardinality: 1,
            cardinality_next: 1,
        }
    }

    pub(crate) fn now(&self) -> u64 {
        self.now
    }

    pub(crate) fn cardinality(&self) -> u16 {
        self.cardinality
    }

    pub(crate) fn cardinality_next(&self) -> u16 {
        self.cardinality_next
    }

    pub(crate) fn current_price(&self) -> Decimal {
        self.latest().price
    }

    pub(crate) fn oldest_age(&self) -> u64 {
        let oldest = self.observations.front().map_or(self.now, |o| o.timestamp);
        self.now - oldest
    }

    pub(crate) fn grow(&mut self, cardinality: u16) -> u16 {
        if cardinality > self.cardinality_next {
            self.cardinality_next = cardinality;
        }
        self.cardinality_next
    }

    pub(crate) fn advance(&mut self, secs: u64) {
        self.now = self.now.saturating_add(secs);
        let price = self.current_price();
        self.write(price);
    }

    pub(crate) fn write(&mut self, price: Decimal) {
        let now = self.now;
        let cumulative = self.cumulative_at(now);

        if let Some(last) = self.observations.back_mut() {
            if last.timestamp == now {
                last.price = price;
                return;
            }
        }

        self.observations.push_back(Observation {
            timestamp: now,
            price_cumulative: cumulative,
            price,
        });

        if self.observations.len() > usize::from(self.cardinality) {
            self.cardinality = self.cardinality.max(self.cardinality_next);
        }
        while self.observations.len() > usize::from(self.cardinality) {
            self.observations.pop_front();
        }
    }

    pub(crate) fn twap(&self, window_secs: u32) -> Result<Decimal, OracleError> {
        if window_secs == 0 {
            return Ok(self.current_price());
        }

        let available_secs = self.oldest_age();
        let window = u64::from(window_secs);
        if window > available_secs {
            return Err(OracleError::InsufficientHistory {
                available_secs,
                requested_secs: window_secs,
            });
        }

        let start = self.cumulative_at(self.now - window);
        let end = self.cumulative_at(self.now);
        Ok((end - start) / Decimal::from(window))
    }

    fn latest(&self) -> Observation {
        // The buffer is created with one observation and never drained below one.
        self.observations.back().copied().unwrap_or(Observation {
            timestamp: self.now,
            price_cumulative: Decimal::ZERO,
            price: Decimal::ZERO,
        })
    }

    fn cumulative_at(&self, t: u64) -> Decimal {
        self.observations
            .iter()
            .rev()
            .find(|o| o.timestamp <= t)
            .map_or(Decimal::ZERO, |o| {
                o.price_cumulative + o.price * Decimal::from(t - o.timestamp)
            })
    }
}
