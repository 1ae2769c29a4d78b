// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate devices exchanging packets through a credit-based switch.
//!
//! See `lib.rs` for details.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bpnet_engine::engine::Engine;
use bpnet_engine::types::{SimError, SimResult};
use bpnet_models::config::NetworkConfig;
use bpnet_models::network::Network;
use bpnet_track::entity::Entity;
use bpnet_track::info;
use clap::Parser;
use indicatif::ProgressBar;
use sim_network::{Cli, Settings, summary};

/// Start the engine and advance a progress bar once per time unit.
fn run_with_progress(engine: &Engine, time_unit: Duration, duration: u64) -> SimResult {
    let progress_bar = ProgressBar::new(duration);
    engine.start()?;
    for _ in 0..duration {
        thread::sleep(time_unit);
        progress_bar.inc(1);
    }
    progress_bar.finish();
    engine.stop();
    engine.join()
}

fn log_config(top: &Arc<Entity>, settings: &Settings, config: &NetworkConfig) {
    info!(top ;
        "Running {} devices for {} time units of {}ms",
        config.devices.len(),
        settings.duration,
        config.timing.time_unit_ms,
    );
    info!(top ; "Traffic ratio {}:1, scheduling policy {}. Random seed {}", config.ratio, config.policy, config.seed);
    info!(top ;
        "Thresholds: backpressure {}, restore {}, priority {}",
        config.thresholds.backpressure,
        config.thresholds.restore,
        config.thresholds.priority,
    );
}

fn main() -> Result<(), SimError> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli)?;
    let config = settings.network_config()?;
    let tracker = settings.trackers()?;

    let engine = Engine::new(&tracker);
    let top = engine.top().clone();
    log_config(&top, &settings, &config);

    let network = Network::new_and_register(&engine, &config)?;
    info!(top ; "Platform built and connected");

    let time_unit = Duration::from_millis(config.timing.time_unit_ms);
    if settings.progress {
        run_with_progress(&engine, time_unit, settings.duration)?;
    } else {
        let duration = u32::try_from(settings.duration)
            .map(|units| time_unit * units)
            .map_err(|_| SimError(format!("duration {} is too long", settings.duration)))?;
        engine.run_for(duration)?;
    }

    for line in summary(&network) {
        info!(top ; "{line}");
        println!("{line}");
    }
    tracker.shutdown();
    Ok(())
}
