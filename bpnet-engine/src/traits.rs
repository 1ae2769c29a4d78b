// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A set of common traits used across the BPNET engine.

use std::sync::Arc;

use crate::executor::Spawner;
use crate::types::SimResult;

/// The `Runnable` trait is implemented by every component that the
/// [`Engine`](crate::engine::Engine) starts.
pub trait Runnable {
    /// Spawn the threads that make up this component.
    ///
    /// This must not block; any long-running work belongs in the spawned
    /// threads.
    fn run(self: Arc<Self>, spawner: &Spawner) -> SimResult;

    /// Ask all threads of this component to finish their current iteration
    /// and return.
    fn stop(&self);
}
