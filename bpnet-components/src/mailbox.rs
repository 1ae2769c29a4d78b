// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A receive buffer with separate control and data lanes.
//!
//! Objects are routed to a lane by [`Classify::is_control`]. The control lane
//! can be waited on with a timeout so that a consumer of control objects
//! reacts as soon as one arrives; the data lane is polled.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bpnet_track::entity::Entity;
use bpnet_track::trace;

use crate::types::Classify;

struct Lanes<T> {
    control: VecDeque<T>,
    data: VecDeque<T>,
}

pub struct Mailbox<T> {
    pub entity: Arc<Entity>,
    lanes: Mutex<Lanes<T>>,
    control_ready: Condvar,
}

impl<T> Mailbox<T>
where
    T: Classify,
{
    #[must_use]
    pub fn new(parent: &Arc<Entity>, name: &str) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            lanes: Mutex::new(Lanes {
                control: VecDeque::new(),
                data: VecDeque::new(),
            }),
            control_ready: Condvar::new(),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Lanes<T>> {
        self.lanes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put(&self, item: T) {
        let is_control = item.is_control();
        {
            let mut lanes = self.guard();
            if is_control {
                lanes.control.push_back(item);
            } else {
                lanes.data.push_back(item);
            }
        }
        if is_control {
            trace!(self.entity ; "control ready");
            self.control_ready.notify_all();
        }
    }

    /// Remove every queued control object without waiting.
    pub fn take_control(&self) -> Vec<T> {
        self.guard().control.drain(..).collect()
    }

    /// Wait up to `timeout` for control objects and remove all of them.
    ///
    /// Returns an empty vector if none arrived in time.
    pub fn wait_control(&self, timeout: Duration) -> Vec<T> {
        let guard = self.guard();
        let (mut lanes, _) = self
            .control_ready
            .wait_timeout_while(guard, timeout, |lanes| lanes.control.is_empty())
            .unwrap_or_else(PoisonError::into_inner);
        lanes.control.drain(..).collect()
    }

    /// Remove up to `max` data objects in arrival order.
    pub fn take_data(&self, max: usize) -> Vec<T> {
        let mut lanes = self.guard();
        let num = max.min(lanes.data.len());
        lanes.data.drain(..num).collect()
    }

    #[must_use]
    pub fn num_data(&self) -> usize {
        self.guard().data.len()
    }

    #[must_use]
    pub fn num_control(&self) -> usize {
        self.guard().control.len()
    }
}

impl<T> Mailbox<T>
where
    T: Classify + Clone,
{
    /// Copy of the data lane in order, without removing anything.
    #[must_use]
    pub fn snapshot_data(&self) -> Vec<T> {
        self.guard().data.iter().cloned().collect()
    }
}
