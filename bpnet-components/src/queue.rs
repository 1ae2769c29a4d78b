// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! An unbounded first-in first-out queue that can be shared between threads.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bpnet_track::entity::Entity;
use bpnet_track::trace;

pub struct Queue<T> {
    pub entity: Arc<Entity>,
    items: Mutex<VecDeque<T>>,
}

impl<T> Queue<T> {
    #[must_use]
    pub fn new(parent: &Arc<Entity>, name: &str) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, name)),
            items: Mutex::new(VecDeque::new()),
        }
    }

    fn guard(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, item: T) {
        self.guard().push_back(item);
    }

    /// Append a batch as one operation so that no other writer can
    /// interleave with it.
    pub fn push_all(&self, batch: Vec<T>) {
        let num = batch.len();
        self.guard().extend(batch);
        trace!(self.entity ; "pushed {num}");
    }

    pub fn pop(&self) -> Option<T> {
        self.guard().pop_front()
    }

    /// Remove and return everything currently queued.
    pub fn drain(&self) -> Vec<T> {
        self.guard().drain(..).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guard().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }
}

impl<T: Clone> Queue<T> {
    /// Copy of the queue contents in order, without removing anything.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.guard().iter().cloned().collect()
    }
}
