// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Packets exchanged between devices and the switch.
//!
//! A packet is either data, which consumes credit at the switch, or a
//! control signal, which is broadcast by the switch and carries no payload.

use std::fmt;

use bpnet_components::types::{Classify, Prioritised, Priority};

/// Devices are identified by small integers.
pub type DeviceId = usize;

/// Congestion signals broadcast by the switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Signal {
    /// Credit for the target is running low.
    Backpressure,
    /// Credit for the target has recovered.
    Restore,
    /// Credit for the target is exhausted.
    CriticalBackpressure,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Signal::Backpressure => "BACKPRESSURE",
            Signal::Restore => "RESTORE",
            Signal::CriticalBackpressure => "CRITICAL_BACKPRESSURE",
        };
        write!(f, "{s}")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketId {
    Data(u32),
    Signal(Signal),
}

impl fmt::Display for PacketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketId::Data(id) => write!(f, "{id}"),
            PacketId::Signal(signal) => write!(f, "{signal}"),
        }
    }
}

/// Traffic classes. `Type1` is the high priority class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrafficClass {
    Type1,
    Type2,
}

impl fmt::Display for TrafficClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficClass::Type1 => write!(f, "type1"),
            TrafficClass::Type2 => write!(f, "type2"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Packet {
    pub id: PacketId,
    /// Size in bits. Zero for control packets.
    pub size: u64,
    pub target: DeviceId,
    pub class: TrafficClass,
}

impl Packet {
    #[must_use]
    pub fn data(id: u32, size: u64, target: DeviceId, class: TrafficClass) -> Self {
        Self {
            id: PacketId::Data(id),
            size,
            target,
            class,
        }
    }

    /// A control packet telling devices about `target`.
    #[must_use]
    pub fn signal(signal: Signal, target: DeviceId) -> Self {
        Self {
            id: PacketId::Signal(signal),
            size: 0,
            target,
            class: TrafficClass::Type1,
        }
    }

    #[must_use]
    pub fn as_signal(&self) -> Option<Signal> {
        match self.id {
            PacketId::Signal(signal) => Some(signal),
            PacketId::Data(_) => None,
        }
    }
}

impl Classify for Packet {
    fn is_control(&self) -> bool {
        matches!(self.id, PacketId::Signal(_))
    }
}

impl Prioritised for Packet {
    fn priority(&self) -> Priority {
        match self.class {
            TrafficClass::Type1 => Priority::High,
            TrafficClass::Type2 => Priority::Low,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            PacketId::Data(_) => write!(
                f,
                "{} ({}, {} bits) -> {}",
                self.id, self.class, self.size, self.target
            ),
            PacketId::Signal(_) => write!(f, "{} for {}", self.id, self.target),
        }
    }
}

/// Format packets as `(id, class)` pairs for buffer and processing reports.
#[must_use]
pub fn summarise(packets: &[Packet]) -> String {
    let items: Vec<String> = packets
        .iter()
        .map(|p| format!("({}, {})", p.id, p.class))
        .collect();
    format!("[{}]", items.join(", "))
}
