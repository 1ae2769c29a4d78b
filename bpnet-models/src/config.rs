// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Configuration of a network model.
//!
//! The defaults describe four devices with receive buffers of 1, 1, 2 and
//! 4 KiB, each sending 10, 20 and 30 packets per time unit to the other
//! devices in ascending id order.

use std::collections::BTreeSet;
use std::fmt;

use bpnet_engine::sim_error;
use bpnet_engine::types::SimResult;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::packet::DeviceId;

/// How the switch orders packets that compete for the same destination.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulingPolicy {
    /// Arrival order.
    #[default]
    Unordered,
    /// All type1 packets before any type2 packet.
    Strict,
    /// Type1 first only when the destination credit is low.
    Threshold,
    /// Interleave type1 and type2 packets by weight.
    Weighted,
}

impl fmt::Display for SchedulingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Packets per time unit that a device sends to one destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rate {
    pub dest: DeviceId,
    pub packets: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub id: DeviceId,

    /// Receive buffer size, i.e. the credit the switch holds for this device.
    pub buffer_bits: u64,

    /// Base sending rates.
    pub rates: Vec<Rate>,
}

/// Fractions of a destination's capacity that trigger switch behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Broadcast BACKPRESSURE when credit falls below this fraction.
    pub backpressure: f64,

    /// Broadcast RESTORE after restoration when credit is at least this
    /// fraction.
    pub restore: f64,

    /// The threshold policy prioritises type1 below this fraction.
    pub priority: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            backpressure: 0.4,
            restore: 0.15,
            priority: 0.10,
        }
    }
}

/// Weights of the weighted round robin policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub high: usize,
    pub low: usize,
}

impl Default for Weights {
    fn default() -> Self {
        Self { high: 2, low: 1 }
    }
}

/// Wall-clock pacing of the component loops.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timing {
    /// Length of one time unit (send, process and restore period).
    pub time_unit_ms: u64,

    /// Pause between switch scheduling passes.
    pub switch_poll_ms: u64,

    /// How long the alert handler waits for a signal before checking
    /// whether it should stop.
    pub alert_poll_us: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            time_unit_ms: 1000,
            switch_poll_ms: 10,
            alert_poll_us: 100,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub devices: Vec<DeviceConfig>,

    pub packet_size_bits: u64,

    /// Data packets a device consumes per time unit.
    pub process_rate: usize,

    /// Type2 packets are sent once for every `ratio` type1 packets.
    pub ratio: i64,

    pub policy: SchedulingPolicy,

    pub thresholds: Thresholds,

    pub weights: Weights,

    pub timing: Timing,

    /// Seed for packet id generation.
    pub seed: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        let buffers = [(1, 1024 * 8), (2, 1024 * 8), (3, 2048 * 8), (4, 4096 * 8)];
        let ids: Vec<DeviceId> = buffers.iter().map(|(id, _)| *id).collect();

        let devices = buffers
            .iter()
            .map(|&(id, buffer_bits)| DeviceConfig {
                id,
                buffer_bits,
                rates: ids
                    .iter()
                    .filter(|&&dest| dest != id)
                    .zip([10, 20, 30])
                    .map(|(&dest, packets)| Rate { dest, packets })
                    .collect(),
            })
            .collect();

        Self {
            devices,
            packet_size_bits: 512,
            process_rate: 10,
            ratio: 1,
            policy: SchedulingPolicy::Unordered,
            thresholds: Thresholds::default(),
            weights: Weights::default(),
            timing: Timing::default(),
            seed: 0,
        }
    }
}

fn check_fraction(name: &str, value: f64) -> SimResult {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        sim_error!(format!("{name} threshold must be in (0, 1], got {value}"))
    }
}

impl NetworkConfig {
    /// Credit restored per destination every time unit.
    #[must_use]
    pub fn quantum(&self) -> u64 {
        self.process_rate as u64 * self.packet_size_bits
    }

    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&DeviceConfig> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn validate(&self) -> SimResult {
        if self.devices.is_empty() {
            return sim_error!("At least one device must be configured");
        }

        let mut ids = BTreeSet::new();
        for device in &self.devices {
            if !ids.insert(device.id) {
                return sim_error!(format!("Device {} configured twice", device.id));
            }
        }

        for device in &self.devices {
            let mut dests = BTreeSet::new();
            for rate in &device.rates {
                if rate.dest == device.id {
                    return sim_error!(format!("Device {} cannot send to itself", device.id));
                }
                if !ids.contains(&rate.dest) {
                    return sim_error!(format!(
                        "Device {} sends to unknown device {}",
                        device.id, rate.dest
                    ));
                }
                if !dests.insert(rate.dest) {
                    return sim_error!(format!(
                        "Device {} has two rates for device {}",
                        device.id, rate.dest
                    ));
                }
            }
        }

        check_fraction("Backpressure", self.thresholds.backpressure)?;
        check_fraction("Restore", self.thresholds.restore)?;
        check_fraction("Priority", self.thresholds.priority)?;

        if self.ratio < 1 {
            return sim_error!(format!("Ratio must be at least 1, got {}", self.ratio));
        }
        if self.weights.high == 0 || self.weights.low == 0 {
            return sim_error!("Weights must be at least 1");
        }
        if self.timing.time_unit_ms == 0 {
            return sim_error!("Time unit must be non-zero");
        }
        Ok(())
    }
}
