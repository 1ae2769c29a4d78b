// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Strict priority policy

use std::sync::Arc;

use bpnet_track::entity::Entity;
use bpnet_track::trace;

use crate::arbiter::Arbitrate;
use crate::arbiter::policy::partition;
use crate::flow_controls::credit_pool::CreditPool;
use crate::types::Prioritised;

/// All high priority objects before any low priority object.
#[derive(Default)]
pub struct StrictPriority;

impl StrictPriority {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T> Arbitrate<T> for StrictPriority
where
    T: Prioritised,
{
    fn arbitrate(&self, entity: &Arc<Entity>, batch: Vec<T>, _credit: &CreditPool) -> Vec<T> {
        let (mut high, low) = partition(batch);
        trace!(entity ; "strict: {} high, {} low", high.len(), low.len());
        high.extend(low);
        high
    }
}
