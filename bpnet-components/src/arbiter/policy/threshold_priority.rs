// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Threshold-gated priority policy
//!
//! While the destination has plenty of credit objects are admitted in
//! arrival order. Once the available credit falls below a fraction of the
//! capacity high priority objects are moved to the front.

use std::sync::Arc;

use bpnet_engine::sim_error;
use bpnet_engine::types::SimError;
use bpnet_track::entity::Entity;
use bpnet_track::trace;

use crate::arbiter::Arbitrate;
use crate::arbiter::policy::partition;
use crate::flow_controls::credit_pool::CreditPool;
use crate::types::Prioritised;

pub struct ThresholdPriority {
    fraction: f64,
}

impl ThresholdPriority {
    pub fn new(fraction: f64) -> Result<Self, SimError> {
        if !(fraction > 0.0 && fraction <= 1.0) {
            return sim_error!(format!(
                "Priority threshold must be in (0, 1], got {fraction}"
            ));
        }
        Ok(Self { fraction })
    }
}

impl<T> Arbitrate<T> for ThresholdPriority
where
    T: Prioritised,
{
    fn arbitrate(&self, entity: &Arc<Entity>, batch: Vec<T>, credit: &CreditPool) -> Vec<T> {
        if !credit.below_fraction(self.fraction) {
            return batch;
        }

        trace!(entity ; "threshold: {} of {} available, prioritising", credit.available(), credit.capacity());
        let (mut high, low) = partition(batch);
        high.extend(low);
        high
    }
}
