// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Arrival order policy

use std::sync::Arc;

use bpnet_track::entity::Entity;

use crate::arbiter::Arbitrate;
use crate::flow_controls::credit_pool::CreditPool;
use crate::types::Prioritised;

/// Keep the batch in arrival order.
#[derive(Default)]
pub struct Unordered;

impl Unordered {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl<T> Arbitrate<T> for Unordered
where
    T: Prioritised,
{
    fn arbitrate(&self, _entity: &Arc<Entity>, batch: Vec<T>, _credit: &CreditPool) -> Vec<T> {
        batch
    }
}
