// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Define the [`Track`] trait a number of [`Tracker`]s.

/// Include the text-based tracker.
pub mod text;

/// Include the multi-tracker.
pub mod multi_tracker;

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub use multi_tracker::MultiTracker;
use regex::Regex;
pub use text::{Stream, TextTracker};

use crate::{Id, ROOT};

/// Error used to return configuration errors
#[derive(Debug)]
pub struct TrackConfigError(pub String);

impl std::fmt::Display for TrackConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for TrackConfigError {}

/// This is the interface that is supported by all [`Tracker`]s.
pub trait Track {
    /// Allocate a new global ID
    fn unique_id(&self) -> Id;

    /// Determine whether tracking is enabled, and at what level for an
    /// entity looked up by its ID.
    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool;

    /// Record the path of a new entity.
    fn add_entity(&self, id: Id, entity_name: &str);

    /// Track a log message of the given level.
    fn log(&self, msg_by: Id, level: log::Level, msg: std::fmt::Arguments);

    /// Track a message for the _process_ stream.
    fn process(&self, msg_by: Id, msg: std::fmt::Arguments);

    /// Perform any pre-exit shutdown/cleanup
    fn shutdown(&self);
}

/// The type of a [`Tracker`] that is shared across entities and threads.
pub type Tracker = Arc<dyn Track + Send + Sync>;

/// Create a [`Tracker`] that prints all track events to `stdout`.
#[must_use]
pub fn stdout_tracker(level: log::Level) -> Tracker {
    let entity_manger = EntityManager::new(level);
    let stdout_writer = Box::new(std::io::BufWriter::new(io::stdout()));
    let tracker: Tracker = Arc::new(TextTracker::new(
        entity_manger,
        stdout_writer,
        Stream::All,
    ));
    tracker
}

/// A tracker that drops everything, for runs where only the end state
/// matters.
pub struct DevNullTracker;

impl Track for DevNullTracker {
    fn unique_id(&self) -> Id {
        Id(0)
    }

    fn is_entity_enabled(&self, _id: Id, _level: log::Level) -> bool {
        false
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {}
    fn log(&self, _id: Id, _level: log::Level, _msg: std::fmt::Arguments) {}
    fn process(&self, _id: Id, _msg: std::fmt::Arguments) {}
    fn shutdown(&self) {}
}

/// Create a [`Tracker`] that suppresses all messages.
#[must_use]
pub fn dev_null_tracker() -> Tracker {
    Arc::new(DevNullTracker)
}

/// The [`EntityManager`] is responsible for determining entity log enable
/// states.
///
/// This manager is also used to allocate unique [`Id`] values and to
/// remember entity names so that text output can refer to entities by name.
pub struct EntityManager {
    /// Level of tracking events to output.
    default_entity_level: log::Level,

    /// List of regular expressions mapping entity names to log levels.
    regex_to_entity_level: Vec<(Regex, log::Level)>,

    /// Used to assign unique IDs.
    unique_id: AtomicU64,

    /// Keep track of entities that have log levels different to the default.
    log_entity_lookup: Mutex<HashMap<Id, log::Level>>,

    /// Full names of all entities seen.
    names: Mutex<HashMap<Id, String>>,

    /// Reference point for timestamps.
    start: Instant,
}

impl EntityManager {
    /// Constructor with default [`log::Level`]
    #[must_use]
    pub fn new(default_entity_level: log::Level) -> Self {
        Self {
            default_entity_level,
            regex_to_entity_level: Vec::new(),
            unique_id: AtomicU64::new(ROOT.0 + 1),
            log_entity_lookup: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            start: Instant::now(),
        }
    }

    fn unique_id(&self) -> Id {
        Id(self.unique_id.fetch_add(1, Ordering::SeqCst))
    }

    fn is_log_enabled_at_level(&self, id: Id, level: log::Level) -> bool {
        let lookup = self
            .log_entity_lookup
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match lookup.get(&id) {
            None => level <= self.default_entity_level,
            Some(entity_level) => level <= *entity_level,
        }
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        let entity_level = self.log_level_for(entity_name);
        if entity_level != self.default_entity_level {
            self.log_entity_lookup
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(id, entity_level);
        }
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entity_name.to_string());
    }

    fn log_level_for(&self, entity_name: &str) -> log::Level {
        for (regex, level) in &self.regex_to_entity_level {
            if regex.is_match(entity_name) {
                return *level;
            }
        }
        self.default_entity_level
    }

    /// Return the name registered for an entity, or its ID if it is unknown.
    #[must_use]
    pub fn name_of(&self, id: Id) -> String {
        self.names
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
            .unwrap_or_else(|| id.to_string())
    }

    /// Time elapsed since this manager was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Add a filter regular expression to set matching entites to a given
    /// level.
    ///
    /// # Example
    ///
    /// ```rust
    /// use bpnet_track::tracker::EntityManager;
    /// let mut manager = EntityManager::new(log::Level::Warn);
    /// manager
    ///     .add_entity_level_filter(".*switch.*", log::Level::Trace)
    ///     .unwrap();
    /// ```
    pub fn add_entity_level_filter(
        &mut self,
        regex_str: &str,
        level: crate::log::Level,
    ) -> Result<(), TrackConfigError> {
        match Regex::new(regex_str) {
            Ok(regex) => self.regex_to_entity_level.push((regex, level)),
            Err(e) => {
                return Err(TrackConfigError(format!(
                    "Failed to parse regex {regex_str}:\n{e}\n"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity_paths() -> Vec<&'static str> {
        vec![
            "top",
            "top::switch",
            "top::device1",
            "top::device2",
        ]
    }

    #[test]
    fn no_filters() {
        let manager = EntityManager::new(log::Level::Error);

        for p in entity_paths() {
            assert_eq!(manager.log_level_for(p), log::Level::Error);
        }
    }

    #[test]
    fn first_filter_wins() {
        let mut manager = EntityManager::new(log::Level::Error);
        manager
            .add_entity_level_filter(r".*device1", log::Level::Info)
            .unwrap();
        manager
            .add_entity_level_filter(r".*device.*", log::Level::Trace)
            .unwrap();
        manager
            .add_entity_level_filter(r"top.*", log::Level::Warn)
            .unwrap();

        let expected_levels = [
            log::Level::Warn,
            log::Level::Warn,
            log::Level::Info,
            log::Level::Trace,
        ];

        for (i, p) in entity_paths().iter().enumerate() {
            assert_eq!(manager.log_level_for(p), expected_levels[i]);
        }
    }

    #[test]
    fn bad_regex() {
        let mut manager = EntityManager::new(log::Level::Error);
        assert!(
            manager
                .add_entity_level_filter(r"top(", log::Level::Info)
                .is_err()
        );
    }

    #[test]
    fn enables_follow_entity_level() {
        let mut manager = EntityManager::new(log::Level::Warn);
        manager
            .add_entity_level_filter(r".*switch", log::Level::Debug)
            .unwrap();

        let top = manager.unique_id();
        let switch = manager.unique_id();
        manager.add_entity(top, "top");
        manager.add_entity(switch, "top::switch");

        assert!(manager.is_log_enabled_at_level(top, log::Level::Warn));
        assert!(!manager.is_log_enabled_at_level(top, log::Level::Info));
        assert!(manager.is_log_enabled_at_level(switch, log::Level::Debug));
        assert!(!manager.is_log_enabled_at_level(switch, log::Level::Trace));
        assert_eq!(manager.name_of(switch), "top::switch");
    }

    #[test]
    fn ids() {
        let manager = EntityManager::new(log::Level::Error);
        for i in 0..10 {
            assert_eq!(manager.unique_id(), Id(i + ROOT.0 + 1));
        }
    }
}
