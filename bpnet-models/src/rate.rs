// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Per-destination sending rates of a device.
//!
//! Rates are written by the alert handler and read by the sender, so each
//! rate is a separate atomic and no lock is needed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::config::Rate;
use crate::packet::{DeviceId, Signal};

/// Result of applying a signal to a rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateChange {
    pub from: u32,
    pub to: u32,
}

impl RateChange {
    #[must_use]
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

pub struct RateTable {
    base: BTreeMap<DeviceId, u32>,
    current: BTreeMap<DeviceId, AtomicU32>,
}

impl RateTable {
    #[must_use]
    pub fn new(rates: &[Rate]) -> Self {
        let base: BTreeMap<DeviceId, u32> = rates.iter().map(|r| (r.dest, r.packets)).collect();
        let current = base
            .iter()
            .map(|(&dest, &packets)| (dest, AtomicU32::new(packets)))
            .collect();
        Self { base, current }
    }

    /// Destinations in ascending id order.
    pub fn destinations(&self) -> impl Iterator<Item = DeviceId> + '_ {
        self.base.keys().copied()
    }

    #[must_use]
    pub fn base(&self, dest: DeviceId) -> Option<u32> {
        self.base.get(&dest).copied()
    }

    #[must_use]
    pub fn current(&self, dest: DeviceId) -> Option<u32> {
        self.current.get(&dest).map(|r| r.load(Ordering::Relaxed))
    }

    /// Current rates in ascending destination order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(DeviceId, u32)> {
        self.current
            .iter()
            .map(|(&dest, r)| (dest, r.load(Ordering::Relaxed)))
            .collect()
    }

    /// Adjust the rate to `dest` in response to `signal`.
    ///
    /// Returns `None` if `dest` is not a destination of this table.
    pub fn apply(&self, signal: Signal, dest: DeviceId) -> Option<RateChange> {
        let base = *self.base.get(&dest)?;
        let rate = self.current.get(&dest)?;
        let from = rate.load(Ordering::Relaxed);
        let to = match signal {
            Signal::Backpressure => (from / 2).max(1),
            Signal::Restore => from.saturating_add(1).min(base),
            Signal::CriticalBackpressure => 0,
        };
        rate.store(to, Ordering::Relaxed);
        Some(RateChange { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RateTable {
        RateTable::new(&[
            Rate { dest: 2, packets: 10 },
            Rate { dest: 3, packets: 20 },
            Rate { dest: 4, packets: 30 },
        ])
    }

    #[test]
    fn backpressure_halves_to_one() {
        let rates = table();
        let steps: Vec<u32> = (0..6)
            .map(|_| rates.apply(Signal::Backpressure, 4).unwrap().to)
            .collect();
        assert_eq!(steps, vec![15, 7, 3, 1, 1, 1]);
    }

    #[test]
    fn backpressure_lifts_zero_to_one() {
        let rates = table();
        rates.apply(Signal::CriticalBackpressure, 2).unwrap();
        assert_eq!(
            rates.apply(Signal::Backpressure, 2),
            Some(RateChange { from: 0, to: 1 })
        );
    }

    #[test]
    fn critical_then_restore() {
        let rates = table();
        assert_eq!(
            rates.apply(Signal::CriticalBackpressure, 3),
            Some(RateChange { from: 20, to: 0 })
        );
        assert_eq!(
            rates.apply(Signal::Restore, 3),
            Some(RateChange { from: 0, to: 1 })
        );
    }

    #[test]
    fn restore_is_capped_at_base() {
        let rates = table();
        let change = rates.apply(Signal::Restore, 2).unwrap();
        assert!(!change.changed());
        assert_eq!(rates.current(2), Some(10));
    }

    #[test]
    fn unknown_destination() {
        let rates = table();
        assert_eq!(rates.apply(Signal::Backpressure, 1), None);
        assert_eq!(rates.snapshot(), vec![(2, 10), (3, 20), (4, 30)]);
    }

    #[test]
    fn restore_at_maximum_rate() {
        let rates = RateTable::new(&[Rate {
            dest: 2,
            packets: u32::MAX,
        }]);
        assert_eq!(
            rates.apply(Signal::Restore, 2),
            Some(RateChange {
                from: u32::MAX,
                to: u32::MAX
            })
        );
    }
}
