// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! The central switch.
//!
//! The switch holds a [`CreditPool`] for every destination sized to that
//! destination's receive buffer. A data packet is admitted only if its
//! destination has enough credit; otherwise it is put back on the queue of
//! the device that sent it to be retried later, so no packet is ever lost.
//!
//! After an admission the switch tells every other device about the state
//! of the destination:
//!  - credit exhausted: `CRITICAL_BACKPRESSURE`
//!  - credit below the backpressure threshold: `BACKPRESSURE`
//!
//! Once per time unit the credit of every destination is restored by the
//! amount the destination consumes in that time and the switch broadcasts
//! `RESTORE` if the credit is back above the restore threshold or
//! `BACKPRESSURE` if it is not.
//!
//! # Threads
//!
//!  - `SwitchListener`: scheduling passes over the inbound queues.
//!  - `BufferRestorer`: credit restoration.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bpnet_components::arbiter::Arbitrate;
use bpnet_components::arbiter::policy::{
    StrictPriority, ThresholdPriority, Unordered, WeightedRoundRobin,
};
use bpnet_components::flow_controls::credit_pool::CreditPool;
use bpnet_components::mailbox::Mailbox;
use bpnet_components::queue::Queue;
use bpnet_components::types::{Classify, Prioritised, Priority};
use bpnet_engine::engine::Engine;
use bpnet_engine::executor::{RunFlag, Spawner};
use bpnet_engine::time::Cadence;
use bpnet_engine::traits::Runnable;
use bpnet_engine::types::{SimError, SimResult};
use bpnet_track::entity::Entity;
use bpnet_track::{debug, error, info, process, trace, warn};

use crate::config::{NetworkConfig, SchedulingPolicy, Thresholds};
use crate::packet::{DeviceId, Packet, Signal};

/// The connections between the switch and one device.
pub struct SwitchPort {
    pub device: DeviceId,

    /// Packets sent by the device.
    pub inbound: Arc<Queue<Packet>>,

    /// The device's receive buffer.
    pub outbound: Arc<Mailbox<Packet>>,

    /// Credit held for the device as a destination.
    pub buffer_bits: u64,
}

/// A packet together with the device that sent it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Submission {
    pub source: DeviceId,
    pub packet: Packet,
}

impl Prioritised for Submission {
    fn priority(&self) -> Priority {
        self.packet.priority()
    }
}

/// Outcome of offering a packet to the switch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Forwarded to the destination; `remaining` credit is left.
    Admitted { remaining: u64 },
    /// Not enough credit; put back on the source queue.
    Requeued,
}

#[derive(Default)]
struct SwitchStats {
    admitted: AtomicU64,
    admitted_bits: AtomicU64,
    requeued: AtomicU64,
    backpressure: AtomicU64,
    restore: AtomicU64,
    critical: AtomicU64,
}

/// Counters read from a running or finished switch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub admitted: u64,
    pub admitted_bits: u64,
    pub requeued: u64,
    pub backpressure_signals: u64,
    pub restore_signals: u64,
    pub critical_signals: u64,
}

/// Build the policy that orders packets competing for a destination.
pub fn build_policy(config: &NetworkConfig) -> Result<Box<dyn Arbitrate<Submission>>, SimError> {
    let policy: Box<dyn Arbitrate<Submission>> = match config.policy {
        SchedulingPolicy::Unordered => Box::new(Unordered::new()),
        SchedulingPolicy::Strict => Box::new(StrictPriority::new()),
        SchedulingPolicy::Threshold => {
            Box::new(ThresholdPriority::new(config.thresholds.priority)?)
        }
        SchedulingPolicy::Weighted => Box::new(WeightedRoundRobin::new(
            config.weights.high,
            config.weights.low,
        )?),
    };
    Ok(policy)
}

pub struct Switch {
    pub entity: Arc<Entity>,
    inbound: BTreeMap<DeviceId, Arc<Queue<Packet>>>,
    outbound: BTreeMap<DeviceId, Arc<Mailbox<Packet>>>,
    credit: Mutex<BTreeMap<DeviceId, CreditPool>>,
    policy: Box<dyn Arbitrate<Submission>>,
    thresholds: Thresholds,
    quantum: u64,
    running: RunFlag,
    poll: Cadence,
    restore: Cadence,
    stats: SwitchStats,
}

impl Switch {
    pub fn new_and_register(
        engine: &Engine,
        parent: &Arc<Entity>,
        config: &NetworkConfig,
        ports: Vec<SwitchPort>,
    ) -> Result<Arc<Self>, SimError> {
        let rc_self = Arc::new(Self::new(parent, config, ports)?);
        engine.register(rc_self.clone());
        Ok(rc_self)
    }

    /// Create a switch without registering it.
    pub fn new(
        parent: &Arc<Entity>,
        config: &NetworkConfig,
        ports: Vec<SwitchPort>,
    ) -> Result<Self, SimError> {
        let entity = Arc::new(Entity::new(parent, "switch"));
        let policy = build_policy(config)?;

        let mut inbound = BTreeMap::new();
        let mut outbound = BTreeMap::new();
        let mut credit = BTreeMap::new();
        for port in ports {
            if inbound.insert(port.device, port.inbound).is_some() {
                return Err(SimError(format!(
                    "{entity}: device {} connected twice",
                    port.device
                )));
            }
            outbound.insert(port.device, port.outbound);
            credit.insert(port.device, CreditPool::new(port.buffer_bits));
        }

        debug!(entity ; "{} ports, {} policy", inbound.len(), config.policy);
        Ok(Self {
            entity,
            inbound,
            outbound,
            credit: Mutex::new(credit),
            policy,
            thresholds: config.thresholds,
            quantum: config.quantum(),
            running: RunFlag::default(),
            poll: Cadence::from_millis(config.timing.switch_poll_ms),
            restore: Cadence::from_millis(config.timing.time_unit_ms),
            stats: SwitchStats::default(),
        })
    }

    fn credit_table(&self) -> MutexGuard<'_, BTreeMap<DeviceId, CreditPool>> {
        self.credit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Credit currently available for `dest`.
    #[must_use]
    pub fn available(&self, dest: DeviceId) -> Option<u64> {
        self.credit_table().get(&dest).map(CreditPool::available)
    }

    /// Copy of the credit pool for `dest`.
    #[must_use]
    pub fn credit(&self, dest: DeviceId) -> Option<CreditPool> {
        self.credit_table().get(&dest).cloned()
    }

    /// Packets waiting in the inbound queues.
    #[must_use]
    pub fn num_queued(&self) -> usize {
        self.inbound.values().map(|q| q.len()).sum()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            admitted: self.stats.admitted.load(Ordering::Relaxed),
            admitted_bits: self.stats.admitted_bits.load(Ordering::Relaxed),
            requeued: self.stats.requeued.load(Ordering::Relaxed),
            backpressure_signals: self.stats.backpressure.load(Ordering::Relaxed),
            restore_signals: self.stats.restore.load(Ordering::Relaxed),
            critical_signals: self.stats.critical.load(Ordering::Relaxed),
        }
    }

    /// Admit `packet` from `source` if its destination has enough credit.
    ///
    /// The credit check, the decrement and the enqueue onto the destination
    /// are done under one lock. Signals are broadcast after the lock is
    /// released.
    pub fn process_packet(&self, source: DeviceId, packet: Packet) -> Result<Admission, SimError> {
        if packet.is_control() {
            return Err(SimError(format!(
                "{}: control packet {packet} offered by Device {source}",
                self.entity
            )));
        }
        let Some(inbound) = self.inbound.get(&source) else {
            return Err(SimError(format!(
                "{}: packet {packet} from unknown Device {source}",
                self.entity
            )));
        };
        let target = packet.target;
        let Some(outbound) = self.outbound.get(&target) else {
            return Err(SimError(format!(
                "{}: packet {packet} from Device {source} to unknown Device {target}",
                self.entity
            )));
        };

        let (remaining, capacity) = {
            let mut credit = self.credit_table();
            let Some(pool) = credit.get_mut(&target) else {
                return Err(SimError(format!(
                    "{}: no credit pool for Device {target}",
                    self.entity
                )));
            };
            let remaining = pool.try_consume(packet.size);
            if remaining.is_some() {
                outbound.put(packet);
            }
            (remaining, pool.capacity())
        };

        let Some(remaining) = remaining else {
            warn!(self.entity ; "Packet from Device {source} to Device {target} dropped due to buffer overflow. Retrying from source");
            inbound.push(packet);
            self.stats.requeued.fetch_add(1, Ordering::Relaxed);
            return Ok(Admission::Requeued);
        };

        info!(self.entity ; "Packet from Device {source} to Device {target} sent. Remaining buffer for Device {target}: {} bytes", remaining / 8);
        self.stats.admitted.fetch_add(1, Ordering::Relaxed);
        self.stats
            .admitted_bits
            .fetch_add(packet.size, Ordering::Relaxed);

        if remaining == 0 {
            self.broadcast(Signal::CriticalBackpressure, target, &[target]);
        } else if (remaining as f64) < self.thresholds.backpressure * capacity as f64 {
            self.broadcast(Signal::Backpressure, target, &[target]);
        }
        Ok(Admission::Admitted { remaining })
    }

    /// Take one packet from every non-empty inbound queue, order the packets
    /// of each destination with the scheduling policy and offer them for
    /// admission.
    ///
    /// Returns the number of packets taken.
    pub fn schedule_pass(&self) -> usize {
        // Destinations in order of first arrival in this pass
        let mut buckets: Vec<(DeviceId, Vec<Submission>)> = Vec::new();
        let mut num_taken = 0;
        for (&source, queue) in &self.inbound {
            let Some(packet) = queue.pop() else {
                continue;
            };
            num_taken += 1;
            let submission = Submission { source, packet };
            match buckets.iter_mut().find(|(dest, _)| *dest == packet.target) {
                Some((_, bucket)) => bucket.push(submission),
                None => buckets.push((packet.target, vec![submission])),
            }
        }

        for (dest, bucket) in buckets {
            let ordered = match self.credit(dest) {
                Some(credit) => self.policy.arbitrate(&self.entity, bucket, &credit),
                None => bucket,
            };
            for submission in ordered {
                if let Err(e) = self.process_packet(submission.source, submission.packet) {
                    error!(self.entity ; "{e}");
                }
            }
        }

        if num_taken > 0 {
            trace!(self.entity ; "pass took {num_taken} packets");
        }
        num_taken
    }

    /// Restore one time unit of credit to every destination and broadcast
    /// its state.
    ///
    /// Returns the signal broadcast for each destination.
    pub fn restore_tick(&self) -> Vec<(DeviceId, Signal)> {
        let restored: Vec<(DeviceId, u64, CreditPool)> = {
            let mut credit = self.credit_table();
            credit
                .iter_mut()
                .map(|(&dest, pool)| {
                    let amount = pool.restore(self.quantum);
                    (dest, amount, pool.clone())
                })
                .collect()
        };

        let mut signals = Vec::with_capacity(restored.len());
        for (dest, amount, pool) in restored {
            process!(self.entity ; "Restored buffer for Device {dest} by {} bytes. Current buffer size: {} bytes", amount / 8, pool.available() / 8);

            let signal = if pool.below_fraction(self.thresholds.restore) {
                Signal::Backpressure
            } else {
                Signal::Restore
            };
            self.broadcast(signal, dest, &[dest]);
            signals.push((dest, signal));
        }
        signals
    }

    /// Send a control packet about `target` to every device not in
    /// `exclude`.
    ///
    /// Returns the number of devices signalled.
    pub fn broadcast(&self, signal: Signal, target: DeviceId, exclude: &[DeviceId]) -> usize {
        let mut num_sent = 0;
        for (id, mailbox) in &self.outbound {
            if exclude.contains(id) {
                continue;
            }
            mailbox.put(Packet::signal(signal, target));
            num_sent += 1;
        }

        let counter = match signal {
            Signal::Backpressure => &self.stats.backpressure,
            Signal::Restore => &self.stats.restore,
            Signal::CriticalBackpressure => &self.stats.critical,
        };
        counter.fetch_add(1, Ordering::Relaxed);
        debug!(self.entity ; "Broadcast {signal} for Device {target} to {num_sent} devices");
        num_sent
    }

    pub fn listen(&self) -> SimResult {
        info!(self.entity ; "Listening for incoming packets every {:?}", self.poll.interval());
        while self.running.is_running() {
            self.schedule_pass();
            self.poll.wait(&self.running);
        }
        Ok(())
    }

    pub fn restore_buffers(&self) -> SimResult {
        info!(self.entity ; "Buffer restoration started");
        while self.restore.wait(&self.running) {
            self.restore_tick();
        }
        Ok(())
    }
}

impl Runnable for Switch {
    fn run(self: Arc<Self>, spawner: &Spawner) -> SimResult {
        let switch = self.clone();
        spawner.spawn("SwitchListener", move || switch.listen())?;

        let switch = self;
        spawner.spawn("BufferRestorer", move || switch.restore_buffers())
    }

    fn stop(&self) {
        info!(self.entity ; "Stopping switch operations");
        self.running.stop();
    }
}
