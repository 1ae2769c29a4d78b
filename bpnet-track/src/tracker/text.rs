// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

pub use log;

use crate::tracker::{EntityManager, Track};
use crate::{Id, SharedWriter, Writer};

/// Selects which events a [`TextTracker`] writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stream {
    /// Leveled _log_ messages.
    Simulation,
    /// Only _process_ messages.
    Processed,
    /// Everything.
    All,
}

/// A simple text logger to output messages to a Writer.
///
/// Each line has the form `[elapsed] [thread] [LEVEL] entity: message`.
pub struct TextTracker {
    entity_manager: EntityManager,

    /// Which events this tracker writes.
    stream: Stream,

    /// Writer to which all _log_ events will be written.
    writer: SharedWriter,
}

impl TextTracker {
    /// Create a new [`TextTracker`] with an [`EntityManager`].
    pub fn new(entity_manager: EntityManager, writer: Writer, stream: Stream) -> Self {
        Self {
            entity_manager,
            stream,
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    fn write_line(&self, id: Id, label: &str, msg: std::fmt::Arguments) {
        let elapsed = self.entity_manager.elapsed().as_secs_f64();
        let current = thread::current();
        let thread_name = current.name().unwrap_or("main");
        let name = self.entity_manager.name_of(id);
        let line = format!("[{elapsed:>10.4}] [{thread_name}] [{label}] {name}: {msg}\n");

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // Write errors are dropped.
        let _ = writer.write_all(line.as_bytes());
    }

    fn writes_simulation(&self) -> bool {
        self.stream != Stream::Processed
    }

    fn writes_processed(&self) -> bool {
        self.stream != Stream::Simulation
    }
}

/// Implementation for each [`Track`] event
impl Track for TextTracker {
    fn unique_id(&self) -> Id {
        self.entity_manager.unique_id()
    }

    fn is_entity_enabled(&self, id: Id, level: log::Level) -> bool {
        self.entity_manager.is_log_enabled_at_level(id, level)
    }

    fn add_entity(&self, id: Id, entity_name: &str) {
        self.entity_manager.add_entity(id, entity_name);
    }

    fn log(&self, id: Id, level: log::Level, msg: std::fmt::Arguments) {
        if self.writes_simulation() {
            self.write_line(id, level.as_str(), msg);
        }
    }

    fn process(&self, id: Id, msg: std::fmt::Arguments) {
        if self.writes_processed() {
            self.write_line(id, "PROCESS", msg);
        }
    }

    fn shutdown(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = writer.flush();
    }
}
