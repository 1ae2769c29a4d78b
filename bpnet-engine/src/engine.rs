// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use bpnet_track::entity::{Entity, toplevel};
use bpnet_track::tracker::stdout_tracker;
use bpnet_track::{Tracker, info, trace};

use crate::executor::Spawner;
use crate::types::{Component, SimResult};

pub struct Registry {
    pub entity: Arc<Entity>,
    components: Mutex<Vec<Component>>,
}

impl Registry {
    fn new(parent: &Arc<Entity>) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, "registry")),
            components: Mutex::new(Vec::new()),
        }
    }

    pub fn register(&self, component: Component) {
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(component);
    }

    pub fn run_components(&self, spawner: &Spawner) -> SimResult {
        let components = self.components();
        trace!(self.entity ; "Starting {} components", components.len());

        for component in components {
            component.run(spawner)?;
        }
        Ok(())
    }

    pub fn stop_components(&self) {
        let components = self.components();
        trace!(self.entity ; "Stopping {} components", components.len());

        for component in components {
            component.stop();
        }
    }

    fn components(&self) -> Vec<Component> {
        self.components
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub struct Engine {
    spawner: Spawner,
    registry: Registry,
    toplevel: Arc<Entity>,
    tracker: Tracker,
}

impl Engine {
    /// Create a standalone engine.
    #[must_use]
    pub fn new(tracker: &Tracker) -> Self {
        let toplevel = toplevel(tracker, "top");
        let spawner = Spawner::new(&toplevel);
        let registry = Registry::new(&toplevel);
        Self {
            spawner,
            registry,
            toplevel,
            tracker: tracker.clone(),
        }
    }

    /// Register a component that will be run as the simulation starts
    pub fn register(&self, component: Component) {
        self.registry.register(component);
    }

    /// Start every registered component.
    ///
    /// If one fails to start, those already running are stopped and joined.
    pub fn start(&self) -> SimResult {
        if let Err(e) = self.registry.run_components(&self.spawner) {
            self.stop();
            let _ = self.join();
            return Err(e);
        }
        Ok(())
    }

    /// Ask every registered component to stop.
    pub fn stop(&self) {
        self.registry.stop_components();
    }

    /// Wait for every spawned thread to return and flush the tracker.
    pub fn join(&self) -> SimResult {
        let result = self.spawner.join_all();
        self.tracker.shutdown();
        result
    }

    /// Run the simulation for a fixed wall-clock duration.
    pub fn run_for(&self, duration: Duration) -> SimResult {
        info!(self.toplevel ; "Running for {:.1}s", duration.as_secs_f64());
        self.start()?;
        thread::sleep(duration);
        info!(self.toplevel ; "Stopping");
        self.stop();
        self.join()
    }

    #[must_use]
    pub fn spawner(&self) -> &Spawner {
        &self.spawner
    }

    #[must_use]
    pub fn top(&self) -> &Arc<Entity> {
        &self.toplevel
    }

    #[must_use]
    pub fn tracker(&self) -> Tracker {
        self.tracker.clone()
    }
}

/// Create a default engine that sends [`Track`](bpnet_track::Track) events to
/// stdout.
///
/// This is provided to keep documentation examples simple with fewer
/// concepts to have to consider at once.
impl Default for Engine {
    fn default() -> Self {
        let tracker = stdout_tracker(log::Level::Warn);
        Self::new(&tracker)
    }
}
