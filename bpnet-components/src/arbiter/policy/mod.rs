// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Scheduling policies.

mod strict_priority;
mod threshold_priority;
mod unordered;
mod weighted_round_robin;

pub use strict_priority::StrictPriority;
pub use threshold_priority::ThresholdPriority;
pub use unordered::Unordered;
pub use weighted_round_robin::WeightedRoundRobin;

use crate::types::{Priority, Prioritised};

/// Split a batch by priority, preserving relative order within each part.
fn partition<T: Prioritised>(batch: Vec<T>) -> (Vec<T>, Vec<T>) {
    batch
        .into_iter()
        .partition(|item| item.priority() == Priority::High)
}
