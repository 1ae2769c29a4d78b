// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Ordering of objects that compete for the same destination.
//!
//! Each scheduling pass groups the objects it has collected by destination
//! and hands every group to an [`Arbitrate`] policy which returns the order
//! in which they should be admitted. The policy may consult the destination
//! credit pool.
//!
//! The policies are found in the [`policy`] module.

use std::sync::Arc;

use bpnet_track::entity::Entity;

use crate::flow_controls::credit_pool::CreditPool;
use crate::types::Prioritised;

pub mod policy;

/// The trait that every scheduling policy implements.
///
/// Policies are stateless between calls so that one instance can be shared
/// by all destinations.
pub trait Arbitrate<T>: Send + Sync
where
    T: Prioritised,
{
    /// Return `batch` in the order it should be admitted.
    ///
    /// The returned vector contains exactly the objects passed in.
    fn arbitrate(&self, entity: &Arc<Entity>, batch: Vec<T>, credit: &CreditPool) -> Vec<T>;
}
