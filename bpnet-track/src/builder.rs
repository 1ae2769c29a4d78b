// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Library functions to build trackers as defined by the user.
//!
//! A simulation writes two text streams: the _simulation_ log (leveled
//! messages) and the _processed_ log (packets consumed by devices and credit
//! restored by the switch). Each stream can be sent to its own file, to
//! `stdout` (file name `-`) or disabled.

use std::io::BufWriter;
use std::sync::Arc;
use std::{fs, io};

use crate::tracker::multi_tracker::MultiTracker;
use crate::tracker::{EntityManager, Stream, TextTracker, TrackConfigError};
use crate::{Tracker, Writer};

/// Configuration options for an individual tracker.
pub struct TrackerConfig<'a> {
    /// Enable this tracker.
    pub enable: bool,

    /// Set the level at which this tracker should be enabled.
    pub level: log::Level,

    /// A regular expression to match which entities should have this level
    /// applied.
    pub filter_regex: &'a str,

    /// If required, the name of the file to which the tracker will write.
    /// `None` or `-` selects `stdout`.
    pub file: Option<&'a str>,
}

impl Default for TrackerConfig<'_> {
    fn default() -> Self {
        Self {
            enable: true,
            level: log::Level::Warn,
            filter_regex: "",
            file: None,
        }
    }
}

/// Configuration options for all tracking.
pub struct TrackersConfig<'a> {
    /// Configuration for the simulation log.
    pub simulation: TrackerConfig<'a>,

    /// Configuration for the processed log.
    pub processed: TrackerConfig<'a>,
}

fn open_writer(file: Option<&str>) -> Result<Writer, TrackConfigError> {
    match file {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(path) => match fs::File::create(path) {
            Ok(f) => Ok(Box::new(BufWriter::new(f))),
            Err(e) => Err(TrackConfigError(format!(
                "Failed to create log file {path}: {e}"
            ))),
        },
    }
}

/// Create a text tracker for one stream.
///
/// The user can pass a filter regular expression which will set the level only
/// for matching Entities and set all other Entities to only emit errors.
fn build_text_tracker(config: &TrackerConfig, stream: Stream) -> Result<Tracker, TrackConfigError> {
    let default_level = if config.filter_regex.is_empty() {
        config.level
    } else {
        log::Level::Error
    };

    let mut entity_manager = EntityManager::new(default_level);
    if !config.filter_regex.is_empty() {
        entity_manager.add_entity_level_filter(config.filter_regex, config.level)?;
    }

    let writer = open_writer(config.file)?;
    Ok(Arc::new(TextTracker::new(entity_manager, writer, stream)))
}

/// Set up the simulation/processed trackers according the the user
/// configuration
pub fn setup_trackers(config: &TrackersConfig) -> Result<Tracker, TrackConfigError> {
    let multi_tracker_required = config.simulation.enable && config.processed.enable;

    if multi_tracker_required {
        Ok(Arc::new(MultiTracker::new(vec![
            build_text_tracker(&config.simulation, Stream::Simulation)?,
            build_text_tracker(&config.processed, Stream::Processed)?,
        ])))
    } else if config.simulation.enable {
        build_text_tracker(&config.simulation, Stream::Simulation)
    } else if config.processed.enable {
        build_text_tracker(&config.processed, Stream::Processed)
    } else {
        build_text_tracker(&TrackerConfig::default(), Stream::All)
    }
}
