// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use crate::Id;
use crate::tracker::{EntityManager, Track, Tracker};

/// Sends every message to each of a set of [`Tracker`]s.
///
/// Used to write the simulation and processed streams to different
/// destinations. Ids are allocated here so that each stream names an entity
/// with the same id.
pub struct MultiTracker {
    ids: EntityManager,
    streams: Vec<Tracker>,
}

impl MultiTracker {
    /// Combine `streams`; messages are offered to them in order.
    #[must_use]
    pub fn new(streams: Vec<Tracker>) -> Self {
        Self {
            ids: EntityManager::new(log::Level::Error),
            streams,
        }
    }

    fn enabled(&self, id: Id, level: log::Level) -> impl Iterator<Item = &Tracker> {
        self.streams
            .iter()
            .filter(move |stream| stream.is_entity_enabled(id, level))
    }
}

impl Track for MultiTracker {
    fn unique_id(&self) -> Id {
        self.ids.unique_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.enabled(id, level).next().is_some()
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.streams
            .iter()
            .for_each(|stream| stream.add_entity(id, entity_name));
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.enabled(id, level)
            .for_each(|stream| stream.log(id, level, msg));
    }

    // Processed lines follow the Info level of each stream.
    fn process(&self, id: Id, msg: std::fmt::Arguments) {
        self.enabled(id, log::Level::Info)
            .for_each(|stream| stream.process(id, msg));
    }

    fn shutdown(&self) {
        self.streams.iter().for_each(|stream| stream.shutdown());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::test_helpers::TestTracker;

    #[test]
    fn fans_out_with_shared_ids() {
        let first = Arc::new(TestTracker::new(50));
        let second = Arc::new(TestTracker::new(900));
        let multi = MultiTracker::new(vec![first.clone(), second.clone()]);

        let id = multi.unique_id();
        multi.add_entity(id, "top::switch");
        multi.log(id, log::Level::Warn, format_args!("low credit"));
        multi.process(id, format_args!("Restored buffer"));

        let expected = vec![
            format!("{id}:WARN: low credit"),
            format!("{id}:PROCESS: Restored buffer"),
        ];
        assert_eq!(first.events(), expected);
        assert_eq!(second.events(), expected);
    }
}
