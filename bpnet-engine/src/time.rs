// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Wall-clock pacing for component loops.

use std::thread;
use std::time::{Duration, Instant};

use crate::executor::RunFlag;

/// Longest single sleep so that a stop request is noticed promptly.
const MAX_SLICE: Duration = Duration::from_millis(10);

/// A fixed interval between iterations of a component loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cadence {
    interval: Duration,
}

impl Cadence {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    #[must_use]
    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep for one interval.
    ///
    /// Returns `false` as soon as `running` is stopped, either before or
    /// during the wait.
    pub fn wait(&self, running: &RunFlag) -> bool {
        let deadline = Instant::now() + self.interval;
        loop {
            if !running.is_running() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep((deadline - now).min(MAX_SLICE));
        }
    }
}
