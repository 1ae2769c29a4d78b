// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Simulate a set of devices exchanging packets through a credit-based
//! switch.
//!
//! Every device sends packets to all the others at a per-destination rate.
//! The switch only forwards a packet while it holds enough credit for the
//! destination's receive buffer and broadcasts `BACKPRESSURE`,
//! `CRITICAL_BACKPRESSURE` and `RESTORE` signals as the credit falls and
//! recovers. Devices slow down, stop and speed up in response.
//!
//! Settings are merged from (lowest priority first):
//!  - built-in defaults,
//!  - a TOML file given with `--conf-file`,
//!  - environment variables prefixed with `BPNET_` (use `__` to reach into
//!    the `network` table, e.g. `BPNET_NETWORK__PROCESS_RATE=5`),
//!  - the command line.
//!
//! The TOML file may contain any of the command-line settings and a
//! `[network]` table describing the whole network:
//! ```toml
//! duration = 20
//! state = "prioritised"
//! priority_policy = "weighted"
//!
//! [network]
//! process_rate = 8
//!
//! [[network.devices]]
//! id = 1
//! buffer_bits = 8192
//! rates = [{ dest = 2, packets = 10 }]
//!
//! [[network.devices]]
//! id = 2
//! buffer_bits = 8192
//! rates = [{ dest = 1, packets = 10 }]
//! ```

use std::fmt;
use std::path::PathBuf;

use bpnet_engine::sim_error;
use bpnet_engine::types::SimError;
use bpnet_models::config::{NetworkConfig, SchedulingPolicy};
use bpnet_models::network::Network;
use bpnet_track::Tracker;
use bpnet_track::builder::{TrackerConfig, TrackersConfig, setup_trackers};
use byte_unit::{Byte, UnitType};
use clap::{Parser, ValueEnum};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "BPNET_";

/// Traffic mix presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrafficState {
    /// Equal amounts of both classes, scheduled in arrival order.
    Equal,
    /// Four type1 packets for every type2 packet, scheduled by
    /// `priority_policy`.
    Prioritised,
}

impl fmt::Display for TrafficState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Scheduling policies available to the prioritised state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriorityPolicy {
    #[default]
    Strict,
    Threshold,
    Weighted,
}

impl From<PriorityPolicy> for SchedulingPolicy {
    fn from(policy: PriorityPolicy) -> Self {
        match policy {
            PriorityPolicy::Strict => SchedulingPolicy::Strict,
            PriorityPolicy::Threshold => SchedulingPolicy::Threshold,
            PriorityPolicy::Weighted => SchedulingPolicy::Weighted,
        }
    }
}

/// Ratio used by [`TrafficState::Prioritised`].
pub const PRIORITISED_RATIO: i64 = 4;

fn is_false(value: &bool) -> bool {
    !*value
}

/// Command-line arguments.
///
/// Every option is optional so that only the values given by the user
/// override the other configuration sources.
#[derive(Debug, Default, Parser, Serialize)]
#[command(about = "Credit-based switch and backpressure simulation")]
pub struct Cli {
    /// Number of time units to run for.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,

    /// Traffic state. Sets the type1:type2 ratio and the scheduling policy.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TrafficState>,

    /// Scheduling policy used when the state is `prioritised`.
    #[arg(long, value_enum)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_policy: Option<PriorityPolicy>,

    /// Override the number of type1 packets sent for every type2 packet.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<i64>,

    /// Seed for packet id generation.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Length of one time unit in milliseconds.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_unit_ms: Option<u64>,

    /// Fraction of a buffer below which BACKPRESSURE is broadcast.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backpressure_threshold: Option<f64>,

    /// Fraction of a buffer that must be free for RESTORE to be broadcast.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_threshold: Option<f64>,

    /// Fraction of a buffer below which the threshold policy prioritises
    /// type1 packets.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_threshold: Option<f64>,

    /// File the simulation log is written to. Use '-' for stdout.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub simulation_log: Option<String>,

    /// File the processed packets log is written to. Use '-' for stdout.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_log: Option<String>,

    /// Level of log message to record.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<log::Level>,

    /// Set a regular expression for which entities should have logging level
    /// set to `--log-level`. Others will have level set to `Error`.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_filter_regex: Option<String>,

    /// Show a progress bar of elapsed time units.
    #[arg(long)]
    #[serde(skip_serializing_if = "is_false")]
    pub progress: bool,

    /// Path to a TOML configuration file.
    #[arg(long)]
    #[serde(skip)]
    pub conf_file: Option<PathBuf>,
}

/// The merged settings of one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub duration: u64,

    /// When set, overrides the ratio and policy of `network`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<TrafficState>,

    pub priority_policy: PriorityPolicy,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_unit_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backpressure_threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_threshold: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority_threshold: Option<f64>,

    pub simulation_log: String,
    pub processed_log: String,
    pub log_level: log::Level,
    pub log_filter_regex: String,
    pub progress: bool,

    pub network: NetworkConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            duration: 10,
            state: None,
            priority_policy: PriorityPolicy::default(),
            ratio: None,
            seed: None,
            time_unit_ms: None,
            backpressure_threshold: None,
            restore_threshold: None,
            priority_threshold: None,
            simulation_log: "simulation.log".to_string(),
            processed_log: "processed.log".to_string(),
            log_level: log::Level::Info,
            log_filter_regex: String::new(),
            progress: false,
            network: NetworkConfig::default(),
        }
    }
}

impl Settings {
    /// Merge the defaults, the optional configuration file, the environment
    /// and the command line.
    pub fn load(cli: &Cli) -> Result<Self, SimError> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if let Some(conf_file) = &cli.conf_file {
            if !conf_file.is_file() {
                return sim_error!(format!(
                    "configuration file {} not found",
                    conf_file.display()
                ));
            }
            figment = figment.merge(Toml::file(conf_file));
        }

        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(cli))
            .extract()
            .map_err(|e| SimError(format!("invalid configuration: {e}")))
    }

    /// The network configuration with the state and overrides applied.
    pub fn network_config(&self) -> Result<NetworkConfig, SimError> {
        let mut config = self.network.clone();

        match self.state {
            Some(TrafficState::Equal) => {
                config.ratio = 1;
                config.policy = SchedulingPolicy::Unordered;
            }
            Some(TrafficState::Prioritised) => {
                config.ratio = PRIORITISED_RATIO;
                config.policy = self.priority_policy.into();
            }
            None => {}
        }

        if let Some(ratio) = self.ratio {
            config.ratio = ratio;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(time_unit_ms) = self.time_unit_ms {
            config.timing.time_unit_ms = time_unit_ms;
        }
        if let Some(fraction) = self.backpressure_threshold {
            config.thresholds.backpressure = fraction;
        }
        if let Some(fraction) = self.restore_threshold {
            config.thresholds.restore = fraction;
        }
        if let Some(fraction) = self.priority_threshold {
            config.thresholds.priority = fraction;
        }

        if self.duration == 0 {
            return sim_error!("duration must be at least one time unit");
        }
        config.validate()?;
        Ok(config)
    }

    /// Create the simulation and processed log streams.
    pub fn trackers(&self) -> Result<Tracker, SimError> {
        let config = TrackersConfig {
            simulation: TrackerConfig {
                enable: true,
                level: self.log_level,
                filter_regex: &self.log_filter_regex,
                file: Some(&self.simulation_log),
            },
            processed: TrackerConfig {
                enable: true,
                level: self.log_level,
                filter_regex: &self.log_filter_regex,
                file: Some(&self.processed_log),
            },
        };
        Ok(setup_trackers(&config)?)
    }
}

/// Format a number of bits as human readable binary bytes.
#[must_use]
pub fn format_bits(bits: u64) -> String {
    let bytes = Byte::from_u64(bits / 8).get_appropriate_unit(UnitType::Binary);
    format!("{bytes:.2}")
}

/// Lines describing the state of the network at the end of a run.
#[must_use]
pub fn summary(network: &Network) -> Vec<String> {
    let mut lines = Vec::new();
    let switch = network.switch();

    for device in network.devices() {
        let rates: Vec<String> = device
            .rates()
            .snapshot()
            .iter()
            .map(|(dest, rate)| format!("{dest}:{rate}"))
            .collect();
        lines.push(format!(
            "Device {}: sent {}, processed {}, buffered {}, rates [{}]",
            device.id(),
            device.num_sent(),
            device.num_processed(),
            device.receive_buffer().num_data(),
            rates.join(", ")
        ));
    }

    let stats = switch.stats();
    lines.push(format!(
        "Switch: admitted {} packets ({}), re-queued {}, still queued {}",
        stats.admitted,
        format_bits(stats.admitted_bits),
        stats.requeued,
        switch.num_queued()
    ));
    lines.push(format!(
        "Signals: BACKPRESSURE {}, RESTORE {}, CRITICAL_BACKPRESSURE {}",
        stats.backpressure_signals, stats.restore_signals, stats.critical_signals
    ));

    for device in network.devices() {
        if let Some(credit) = switch.credit(device.id()) {
            lines.push(format!(
                "Credit for Device {}: {} of {}",
                device.id(),
                format_bits(credit.available()),
                format_bits(credit.capacity())
            ));
        }
    }
    lines
}
