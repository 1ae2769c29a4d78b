// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! This module provides helper functions for testing logging output
//!
//! The aim of this module is to provide commonly-used functions that enable the
//! testing of the output that should appear from logging macros.
//!
//! Components run on several threads, so events can arrive in any order.
//! Tests of threaded behaviour should use [`count_matching`] rather than
//! [`check_and_clear`].

use core::sync::atomic::Ordering;
use std::path::Path;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::{Id, Track, Tracker};

/// A tracker that keeps track events.
pub struct TestTracker {
    events: Mutex<Vec<String>>,

    unique_id: AtomicU64,

    /// Prefix for echoed events.
    label: String,
}

impl TestTracker {
    /// Create a new [`Tracker`](crate::Tracker) for the tests.
    ///
    /// This keeps the track events in memory for checking later.
    #[must_use]
    pub fn new(initial_id: u64) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            unique_id: AtomicU64::new(initial_id),
            label: String::new(),
        }
    }

    fn add_event(&self, event: String) {
        if self.label.is_empty() {
            println!("{event}");
        } else {
            println!("{}: {event}", self.label);
        }
        let mut events = self.events.lock().unwrap();
        events.push(event);
    }

    /// Return a copy of all events seen since creation or the last clear.
    #[must_use]
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    /// Discard all recorded events.
    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Track for TestTracker {
    fn unique_id(&self) -> Id {
        let id = self.unique_id.fetch_add(1, Ordering::SeqCst);
        Id(id)
    }

    fn is_entity_enabled(&self, _id: Id, _level: log::Level) -> bool {
        true
    }

    fn add_entity(&self, _id: Id, _entity_name: &str) {
        // Do nothing
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        self.add_event(format!("{id}:{level}: {msg}"));
    }

    fn process(&self, id: Id, msg: std::fmt::Arguments) {
        self.add_event(format!("{id}:PROCESS: {msg}"));
    }

    fn shutdown(&self) {
        // Do nothing
    }
}

/// Initialise the logging system for tests
///
/// *Note*: this is called `test_init` because macros are exported at the root
/// of the crate.
///
/// # Arguments
///
/// * `start_id` - The ID value to be set as the starting value
///
/// # Examples
///
/// ```
/// use bpnet_track::test_helpers;
///
/// let (test_tracker, tracker) = bpnet_track::test_init!(10);
/// let top = bpnet_track::entity::toplevel(&tracker, "top");
/// bpnet_track::info!(top ; "ready");
/// test_helpers::check_and_clear(&test_tracker, &["10:INFO: ready"]);
/// ```
#[macro_export]
macro_rules! test_init {
    ($start_id:expr) => {{
        let test_tracker = std::sync::Arc::new($crate::test_helpers::TestTracker::new($start_id));
        let tracker: $crate::Tracker = test_tracker.clone();
        (test_tracker, tracker)
    }};
}

/// Create a [`TestTracker`] and the shared [`Tracker`] handle to it.
///
/// The stem of `full_filepath` (normally `file!()` of the test) is used to
/// label echoed events.
#[must_use]
pub fn create_tracker(full_filepath: &str) -> (Arc<TestTracker>, Tracker) {
    let label = Path::new(full_filepath)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut test_tracker = TestTracker::new(crate::ROOT.0 + 1);
    test_tracker.label = label;
    let test_tracker = Arc::new(test_tracker);
    let tracker: Tracker = test_tracker.clone();
    (test_tracker, tracker)
}

/// Check and clear the _log_ and _process_ output
///
/// This function asserts that the logging output lines seen since the start or
/// the last time this function was called are expected.
///
/// It then also clears the events recorded so far.
///
/// # Arguments
///
/// * `tracker`  - A reference to the [`TestTracker`] being used in the test.
///   This will have been keeping track of the events seen since
///   it was created or last cleared.
/// * `expected` - An array of expected regular expressions that the logging
///   output will be matched against.
pub fn check_and_clear(tracker: &TestTracker, expected: &[&str]) {
    let mut log_contents_ref = tracker.events.lock().unwrap();

    println!("Checking {:?} matches {:?}", expected, *log_contents_ref);

    // Check that there are the same number of strings produced as expected
    let num_strings = expected.len();
    assert_eq!(num_strings, log_contents_ref.len());

    for (i, log_expect) in expected.iter().enumerate() {
        let re = Regex::new(log_expect).unwrap();
        let actual = &(*log_contents_ref[i]);
        println!("Checking {i}: {log_expect:?} matches {actual:?}");
        assert!(re.is_match(actual));
    }

    log_contents_ref.clear();
}

/// Count the recorded events that match a regular expression.
#[must_use]
pub fn count_matching(tracker: &TestTracker, pattern: &str) -> usize {
    let re = Regex::new(pattern).unwrap();
    tracker
        .events
        .lock()
        .unwrap()
        .iter()
        .filter(|event| re.is_match(event))
        .count()
}
