// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! An end device.
//!
//! A device runs three loops on their own threads:
//!  - the sender generates packets for every destination at the current rate
//!    once per time unit and hands them to the switch in one batch;
//!  - the processor consumes up to `process_rate` data packets from the
//!    receive buffer once per time unit;
//!  - the alert handler waits on the control lane of the receive buffer and
//!    adapts the sending rates as signals arrive.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use bpnet_components::mailbox::Mailbox;
use bpnet_components::queue::Queue;
use bpnet_engine::engine::Engine;
use bpnet_engine::executor::{RunFlag, Spawner};
use bpnet_engine::time::Cadence;
use bpnet_engine::traits::Runnable;
use bpnet_engine::types::{SimError, SimResult};
use bpnet_track::entity::Entity;
use bpnet_track::{debug, error, info, process, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{DeviceConfig, NetworkConfig};
use crate::packet::{DeviceId, Packet, Signal, summarise};
use crate::rate::{RateChange, RateTable};
use crate::traffic::TrafficMix;

/// Range of the random ids given to data packets.
const PACKET_IDS: std::ops::RangeInclusive<u32> = 1000..=9999;

pub struct Device {
    pub entity: Arc<Entity>,
    id: DeviceId,
    rates: RateTable,
    mix: Mutex<TrafficMix>,
    rng: Mutex<StdRng>,
    packet_size_bits: u64,
    process_rate: usize,

    /// Queue at the switch for packets from this device.
    switch_queue: Arc<Queue<Packet>>,

    /// Receive buffer, filled by the switch.
    received: Arc<Mailbox<Packet>>,

    running: RunFlag,
    cadence: Cadence,
    alert_poll: Duration,

    num_sent: AtomicUsize,
    num_processed: AtomicUsize,
}

impl Device {
    pub fn new_and_register(
        engine: &Engine,
        parent: &Arc<Entity>,
        device: &DeviceConfig,
        config: &NetworkConfig,
        switch_queue: Arc<Queue<Packet>>,
        received: Arc<Mailbox<Packet>>,
    ) -> Result<Arc<Self>, SimError> {
        let rc_self = Arc::new(Self::new(parent, device, config, switch_queue, received));
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Create a device without registering it.
    ///
    /// The caller is responsible for driving the device, normally by calling
    /// the `*_tick` functions directly from a test.
    #[must_use]
    pub fn new(
        parent: &Arc<Entity>,
        device: &DeviceConfig,
        config: &NetworkConfig,
        switch_queue: Arc<Queue<Packet>>,
        received: Arc<Mailbox<Packet>>,
    ) -> Self {
        let entity = Arc::new(Entity::new(parent, &format!("device{}", device.id)));
        Self {
            entity,
            id: device.id,
            rates: RateTable::new(&device.rates),
            mix: Mutex::new(TrafficMix::new(config.ratio)),
            rng: Mutex::new(StdRng::seed_from_u64(config.seed ^ device.id as u64)),
            packet_size_bits: config.packet_size_bits,
            process_rate: config.process_rate,
            switch_queue,
            received,
            running: RunFlag::default(),
            cadence: Cadence::from_millis(config.timing.time_unit_ms),
            alert_poll: Duration::from_micros(config.timing.alert_poll_us),
            num_sent: AtomicUsize::new(0),
            num_processed: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    #[must_use]
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    #[must_use]
    pub fn current_rate(&self, dest: DeviceId) -> Option<u32> {
        self.rates.current(dest)
    }

    #[must_use]
    pub fn receive_buffer(&self) -> &Arc<Mailbox<Packet>> {
        &self.received
    }

    #[must_use]
    pub fn num_sent(&self) -> usize {
        self.num_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn num_processed(&self) -> usize {
        self.num_processed.load(Ordering::Relaxed)
    }

    /// Generate one time unit of packets and hand them to the switch.
    ///
    /// Returns the number of packets sent.
    pub fn send_tick(&self) -> usize {
        let mut batch = Vec::new();
        {
            let mut mix = self.mix.lock().unwrap_or_else(PoisonError::into_inner);
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            for dest in self.rates.destinations() {
                let rate = self.rates.current(dest).unwrap_or(0);
                for _ in 0..rate {
                    let class = mix.next_class();
                    let id = rng.gen_range(PACKET_IDS);
                    batch.push(Packet::data(id, self.packet_size_bits, dest, class));
                }
            }
        }

        let num_sent = batch.len();
        self.switch_queue.push_all(batch);
        self.num_sent.fetch_add(num_sent, Ordering::Relaxed);
        debug!(self.entity ; "Sent {num_sent} packets to the switch");
        num_sent
    }

    /// Report the receive buffer and consume up to `process_rate` data
    /// packets. Control packets are never consumed here.
    pub fn process_tick(&self) -> Vec<Packet> {
        let buffered = self.received.snapshot_data();
        if !buffered.is_empty() {
            info!(self.entity ; "Buffer Status ({} packets): {}", buffered.len(), summarise(&buffered));
        }

        let processed = self.received.take_data(self.process_rate);
        if !processed.is_empty() {
            self.num_processed
                .fetch_add(processed.len(), Ordering::Relaxed);
            process!(self.entity ; "Processed packets (IDs and Types): {}", summarise(&processed));
        }
        processed
    }

    /// Wait up to `timeout` for signals and apply all of them.
    ///
    /// Returns the number of signals handled.
    pub fn handle_alerts(&self, timeout: Duration) -> usize {
        let signals = self.received.wait_control(timeout);
        for packet in &signals {
            self.apply_signal(packet);
        }
        signals.len()
    }

    /// Adjust the rate named by a control packet.
    ///
    /// Data packets and signals about devices this device does not send to
    /// are ignored and return `None`.
    pub fn apply_signal(&self, packet: &Packet) -> Option<RateChange> {
        let Some(signal) = packet.as_signal() else {
            trace!(self.entity ; "Ignoring data packet {packet} on the control path");
            return None;
        };

        let target = packet.target;
        let Some(change) = self.rates.apply(signal, target) else {
            debug!(self.entity ; "Ignoring {signal} for Device {target}");
            return None;
        };

        if change.changed() {
            match signal {
                Signal::Backpressure => {
                    warn!(self.entity ; "Received {signal} signal. Slowing down transmission to Device {target} to {}", change.to);
                }
                Signal::Restore => {
                    info!(self.entity ; "Received {signal} signal. Speeding up transmission to Device {target} to {}", change.to);
                }
                Signal::CriticalBackpressure => {
                    error!(self.entity ; "Received {signal} signal. Stopping transmission to Device {target}");
                }
            }
        }
        Some(change)
    }

    pub fn send_packets(&self) -> SimResult {
        info!(self.entity ; "Sender started");
        while self.running.is_running() {
            self.send_tick();
            self.cadence.wait(&self.running);
        }
        Ok(())
    }

    pub fn process_incoming(&self) -> SimResult {
        info!(self.entity ; "Processor started");
        while self.running.is_running() {
            self.process_tick();
            self.cadence.wait(&self.running);
        }
        Ok(())
    }

    pub fn check_alerts(&self) -> SimResult {
        info!(self.entity ; "Alert handler started");
        while self.running.is_running() {
            self.handle_alerts(self.alert_poll);
        }
        Ok(())
    }
}

impl Runnable for Device {
    fn run(self: Arc<Self>, spawner: &Spawner) -> SimResult {
        let id = self.id;

        let device = self.clone();
        spawner.spawn(&format!("Device{id}Sender"), move || device.send_packets())?;

        let device = self.clone();
        spawner.spawn(&format!("Device{id}Processor"), move || {
            device.process_incoming()
        })?;

        let device = self;
        spawner.spawn(&format!("Device{id}AlertHandler"), move || {
            device.check_alerts()
        })
    }

    fn stop(&self) {
        info!(self.entity ; "Stopping");
        self.running.stop();
    }
}
