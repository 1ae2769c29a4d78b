// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Weighted Round Robin policy
//!
//! Interleaves up to `high` high priority objects with up to `low` low
//! priority objects while both kinds remain, then appends whatever is left.
//! Relative order within each priority is preserved.

use std::collections::VecDeque;
use std::sync::Arc;

use bpnet_engine::sim_error;
use bpnet_engine::types::SimError;
use bpnet_track::entity::Entity;
use bpnet_track::trace;

use crate::arbiter::Arbitrate;
use crate::arbiter::policy::partition;
use crate::flow_controls::credit_pool::CreditPool;
use crate::types::Prioritised;

pub struct WeightedRoundRobin {
    high: usize,
    low: usize,
}

impl WeightedRoundRobin {
    pub fn new(high: usize, low: usize) -> Result<Self, SimError> {
        if high == 0 || low == 0 {
            return sim_error!("Weighted round robin weights must be at least 1");
        }
        Ok(Self { high, low })
    }
}

impl<T> Arbitrate<T> for WeightedRoundRobin
where
    T: Prioritised,
{
    fn arbitrate(&self, entity: &Arc<Entity>, batch: Vec<T>, _credit: &CreditPool) -> Vec<T> {
        let (high, low) = partition(batch);
        trace!(entity ; "wrr {}:{}: {} high, {} low", self.high, self.low, high.len(), low.len());

        let mut high = VecDeque::from(high);
        let mut low = VecDeque::from(low);
        let mut ordered = Vec::with_capacity(high.len() + low.len());

        while !high.is_empty() && !low.is_empty() {
            let num_high = self.high.min(high.len());
            ordered.extend(high.drain(..num_high));
            let num_low = self.low.min(low.len());
            ordered.extend(low.drain(..num_low));
        }
        ordered.extend(high);
        ordered.extend(low);
        ordered
    }
}
