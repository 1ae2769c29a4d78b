// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A bounded amount of credit.
//!
//! Credit is consumed when an object is admitted and restored periodically.
//! The amount available never exceeds the capacity and never goes below zero.
//!
//! The pool itself is not synchronised; owners that share it between threads
//! keep it behind a lock so that checking and consuming credit is a single
//! step.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreditPool {
    capacity: u64,
    available: u64,
}

impl CreditPool {
    /// Create a pool that starts full.
    #[must_use]
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            available: capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    #[must_use]
    pub fn available(&self) -> u64 {
        self.available
    }

    /// Consume `amount` if that much is available.
    ///
    /// Returns the remaining credit on success and leaves the pool unchanged
    /// on failure.
    pub fn try_consume(&mut self, amount: u64) -> Option<u64> {
        if self.available >= amount {
            self.available -= amount;
            Some(self.available)
        } else {
            None
        }
    }

    /// Add up to `quantum`, clamped at capacity. Returns the amount added.
    pub fn restore(&mut self, quantum: u64) -> u64 {
        let restored = quantum.min(self.capacity - self.available);
        self.available += restored;
        restored
    }

    /// True if the available credit is strictly below `fraction` of capacity.
    #[must_use]
    pub fn below_fraction(&self, fraction: f64) -> bool {
        (self.available as f64) < fraction * self.capacity as f64
    }
}
