// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Thread management for running components.
//!
//! Every component loop runs on its own named OS thread. The [`Spawner`]
//! keeps the join handles so that the [`Engine`](crate::engine::Engine) can
//! wait for all of them and report the first failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use bpnet_track::entity::Entity;
use bpnet_track::{debug, error};

use crate::types::{SimError, SimResult};

/// Shared flag that component loops poll to know whether to keep going.
///
/// Clones refer to the same flag.
#[derive(Clone, Debug)]
pub struct RunFlag(Arc<AtomicBool>);

impl RunFlag {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for RunFlag {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

type Handles = Vec<(String, JoinHandle<SimResult>)>;

/// `Spawner` spawns new threads and remembers them so they can be joined.
#[derive(Clone)]
pub struct Spawner {
    pub entity: Arc<Entity>,
    handles: Arc<Mutex<Handles>>,
}

impl Spawner {
    #[must_use]
    pub fn new(parent: &Arc<Entity>) -> Self {
        Self {
            entity: Arc::new(Entity::new(parent, "spawner")),
            handles: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Spawn a named thread running `f`.
    pub fn spawn<F>(&self, name: &str, f: F) -> SimResult
    where
        F: FnOnce() -> SimResult + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .map_err(|e| SimError(format!("failed to spawn {name}: {e}")))?;

        debug!(self.entity ; "Spawned {name}");
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((name.to_string(), handle));
        Ok(())
    }

    /// Number of threads spawned and not yet joined.
    #[must_use]
    pub fn num_running(&self) -> usize {
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for all spawned threads to finish.
    ///
    /// Every thread is joined even if an earlier one failed. The first error
    /// (including a panic) is returned.
    pub fn join_all(&self) -> SimResult {
        let handles: Handles = self
            .handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        let mut result = Ok(());
        for (name, handle) in handles {
            let outcome = match handle.join() {
                Ok(outcome) => outcome,
                Err(_) => Err(SimError(format!("{name} panicked"))),
            };
            if let Err(e) = outcome {
                error!(self.entity ; "{name}: {e}");
                if result.is_ok() {
                    result = Err(e);
                }
            } else {
                debug!(self.entity ; "Joined {name}");
            }
        }
        result
    }
}
