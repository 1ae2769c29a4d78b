// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::collections::BTreeMap;
use std::sync::Arc;

use bpnet_components::mailbox::Mailbox;
use bpnet_components::queue::Queue;
use bpnet_track::entity::{Entity, toplevel};
use bpnet_track::test_helpers::{TestTracker, create_tracker};

use crate::config::NetworkConfig;
use crate::device::Device;
use crate::packet::{DeviceId, Packet, TrafficClass};
use crate::switch::{Switch, SwitchPort};

/// A switch connected to plain queues and mailboxes so that tests can play
/// the part of the devices.
pub struct SwitchHarness {
    pub test_tracker: Arc<TestTracker>,
    pub top: Arc<Entity>,
    pub switch: Switch,
    pub inbound: BTreeMap<DeviceId, Arc<Queue<Packet>>>,
    pub outbound: BTreeMap<DeviceId, Arc<Mailbox<Packet>>>,
}

#[must_use]
pub fn switch_harness(full_filepath: &str, config: &NetworkConfig) -> SwitchHarness {
    let (test_tracker, tracker) = create_tracker(full_filepath);
    let top = toplevel(&tracker, "top");

    let mut inbound = BTreeMap::new();
    let mut outbound = BTreeMap::new();
    let mut ports = Vec::new();
    for device in &config.devices {
        let rx = Arc::new(Queue::new(&top, &format!("uplink{}", device.id)));
        let tx = Arc::new(Mailbox::new(&top, &format!("rx_buffer{}", device.id)));
        inbound.insert(device.id, rx.clone());
        outbound.insert(device.id, tx.clone());
        ports.push(SwitchPort {
            device: device.id,
            inbound: rx,
            outbound: tx,
            buffer_bits: device.buffer_bits,
        });
    }

    let switch = Switch::new(&top, config, ports).unwrap();
    SwitchHarness {
        test_tracker,
        top,
        switch,
        inbound,
        outbound,
    }
}

/// A single device whose switch queue and receive buffer are exposed.
pub struct DeviceHarness {
    pub test_tracker: Arc<TestTracker>,
    pub device: Device,
    pub switch_queue: Arc<Queue<Packet>>,
    pub received: Arc<Mailbox<Packet>>,
}

#[must_use]
pub fn device_harness(full_filepath: &str, config: &NetworkConfig, id: DeviceId) -> DeviceHarness {
    let (test_tracker, tracker) = create_tracker(full_filepath);
    let top = toplevel(&tracker, "top");
    let switch_queue = Arc::new(Queue::new(&top, "uplink"));
    let received = Arc::new(Mailbox::new(&top, "rx_buffer"));
    let device = Device::new(
        &top,
        config.device(id).unwrap(),
        config,
        switch_queue.clone(),
        received.clone(),
    );
    DeviceHarness {
        test_tracker,
        device,
        switch_queue,
        received,
    }
}

/// A default sized data packet with a recognisable id.
#[must_use]
pub fn data_packet(id: u32, target: DeviceId, class: TrafficClass) -> Packet {
    Packet::data(id, 512, target, class)
}
