// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Named simulation objects.
//!
//! An [`Entity`] is identified in log output by its path from the top-level
//! entity, for example `top::switch` or `top::rx_buffer3`. Level filters are
//! matched against this path when the entity is registered with its
//! [`Tracker`].

use std::fmt;
use std::sync::Arc;

use crate::{Id, Tracker};

const SEPARATOR: &str = "::";

/// The logging identity of a model object.
pub struct Entity {
    path: String,

    /// Allocated by the tracker and used to tag every message.
    pub id: Id,

    /// Where messages of this entity are sent.
    pub tracker: Tracker,
}

impl Entity {
    /// Create an entity named `name` below `parent`.
    #[must_use]
    pub fn new(parent: &Arc<Entity>, name: &str) -> Self {
        let path = format!("{}{SEPARATOR}{name}", parent.path);
        Self::register(&parent.tracker, path)
    }

    fn register(tracker: &Tracker, path: String) -> Self {
        let id = tracker.unique_id();
        tracker.add_entity(id, &path);
        Self {
            path,
            id,
            tracker: tracker.clone(),
        }
    }

    /// The full path, e.g. `top::device1`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.path
    }

    /// The last component of the path.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit(SEPARATOR).next().unwrap_or(&self.path)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({} {})", self.id, self.path)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// Create the root of an entity hierarchy.
#[must_use]
pub fn toplevel(tracker: &Tracker, name: &str) -> Arc<Entity> {
    Arc::new(Entity::register(tracker, name.to_string()))
}
