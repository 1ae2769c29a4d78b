// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! This crate provides the _track_ capabilities for the BPNET project.
//!
//! Every switch, device, queue and mailbox owns an [`entity::Entity`] and
//! emits text-based human-readable _log_ messages through it at various
//! levels of verbosity (from `Trace` through to `Error`). Levels can be set
//! per entity with regular expressions on the entity paths.
//!
//! In addition to the leveled _log_ messages there is a dedicated _process_
//! stream used to record the packets that devices have consumed and the
//! credit the switch has restored. The two streams are normally written to
//! different files (see [`builder`]).
//!
//! All trackers are `Send + Sync` so that a single [`Tracker`] can be shared
//! by every thread of a running simulation.

// Enable warnings for missing documentation
#![warn(missing_docs)]

use std::sync::{Arc, Mutex};

pub use log;

pub mod builder;
pub mod entity;
pub mod id;
pub mod test_helpers;

/// Include the trackers.
pub mod tracker;
pub use id::Id;
pub use tracker::{Track, Tracker};

/// A type alias for objects that receive _log_ / _process_ text.
///
/// The writer must implement Send in order to be shared between threads.
pub type Writer = Box<dyn std::io::Write + Send>;
type SharedWriter = Arc<Mutex<Writer>>;

/// The root ID from which all other IDs are derived
pub const ROOT: Id = Id(1);

/// Base macro for log messages of all level.
///
/// The message is only formatted and passed on to the [`Track::log`]
/// function if the entity is enabled at the requested level.
#[macro_export]
macro_rules! log_base {
    ($entity:expr ; $lvl:expr, $($arg:tt)+) => (
        if $entity.tracker.is_entity_enabled($entity.id, $lvl) {
            $entity.tracker.log($entity.id, $lvl, format_args!($($arg)+));
        }
    );
}

/// The `trace` macro emits a _log_ message at level `log::Level::Trace`
#[macro_export]
macro_rules! trace {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Trace, $($arg)+);
    );
}

/// The `debug` macro emits a _log_ message at level `log::Level::Debug`
#[macro_export]
macro_rules! debug {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Debug, $($arg)+);
    );
}

/// The `info` macro emits a _log_ message at level `log::Level::Info`
#[macro_export]
macro_rules! info {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Info, $($arg)+);
    );
}

/// The `warn` macro emits a _log_ message at level `log::Level::Warn`
#[macro_export]
macro_rules! warn {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Warn, $($arg)+);
    );
}

/// The `error` macro emits a _log_ message at level `log::Level::Error`
///
/// This is also the level used for critical events (such as a device being
/// told to stop sending to a destination).
#[macro_export]
macro_rules! error {
    ($entity:expr ; $($arg:tt)+) => (
        $crate::log_base!($entity ; $crate::log::Level::Error, $($arg)+);
    );
}

/// The `process` macro emits a message to the _process_ stream.
///
/// Process events are enabled whenever the entity is enabled at
/// `log::Level::Info`.
#[macro_export]
macro_rules! process {
    ($entity:expr ; $($arg:tt)+) => (
        if $entity
            .tracker
            .is_entity_enabled($entity.id, $crate::log::Level::Info)
        {
            $entity.tracker.process($entity.id, format_args!($($arg)+));
        }
    );
}
