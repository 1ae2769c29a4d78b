// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

#![doc(test(attr(warn(unused))))]

//! `BPNET` engine
//!
//! This library provides the [engine](crate::engine) which runs the
//! components of a switch simulation. Unlike an event-driven simulator each
//! component owns one or more OS threads which run in wall-clock time; the
//! engine is responsible for starting them, asking them to stop and joining
//! them.
//!
//! # Simple Application
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! use bpnet_engine::engine::Engine;
//! use bpnet_engine::executor::{RunFlag, Spawner};
//! use bpnet_engine::time::Cadence;
//! use bpnet_engine::traits::Runnable;
//! use bpnet_engine::types::SimResult;
//!
//! struct Ticker {
//!     ticks: AtomicUsize,
//!     running: RunFlag,
//! }
//!
//! impl Runnable for Ticker {
//!     fn run(self: Arc<Self>, spawner: &Spawner) -> SimResult {
//!         spawner.spawn("Ticker", move || {
//!             let cadence = Cadence::from_millis(1);
//!             while cadence.wait(&self.running) {
//!                 self.ticks.fetch_add(1, Ordering::Relaxed);
//!             }
//!             Ok(())
//!         })
//!     }
//!
//!     fn stop(&self) {
//!         self.running.stop();
//!     }
//! }
//!
//! let engine = Engine::default();
//! let ticker = Arc::new(Ticker {
//!     ticks: AtomicUsize::new(0),
//!     running: RunFlag::default(),
//! });
//! engine.register(ticker.clone());
//! engine.run_for(Duration::from_millis(20)).unwrap();
//! assert!(ticker.ticks.load(Ordering::Relaxed) > 0);
//! ```

pub mod engine;
pub mod executor;
pub mod test_helpers;
pub mod time;
pub mod traits;
pub mod types;

#[macro_export]
/// Start all registered components, let them run for the given duration and
/// then stop and join them.
macro_rules! run_simulation {
    ($engine:ident, $duration:expr) => {
        $engine.run_for($duration).unwrap();
    };
}
