// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::sync::Barrier;
use std::thread;

use bpnet_components::types::Classify;
use bpnet_models::config::{NetworkConfig, SchedulingPolicy};
use bpnet_models::packet::{Packet, PacketId, Signal, TrafficClass};
use bpnet_models::switch::Admission;
use bpnet_models::test_helpers::{data_packet, switch_harness};
use bpnet_track::test_helpers::count_matching;

fn signals(packets: &[Packet]) -> Vec<(Signal, usize)> {
    packets
        .iter()
        .filter_map(|p| p.as_signal().map(|s| (s, p.target)))
        .collect()
}

#[test]
fn sixteen_packets_exhaust_device1() {
    let h = switch_harness(file!(), &NetworkConfig::default());

    for i in 0..16 {
        let admission = h
            .switch
            .process_packet(2, data_packet(1000 + i, 1, TrafficClass::Type1))
            .unwrap();
        assert_eq!(
            admission,
            Admission::Admitted {
                remaining: 8192 - 512 * u64::from(i + 1)
            }
        );
    }
    assert_eq!(h.switch.available(1), Some(0));

    // Backpressure after the 10th..15th admission, critical after the 16th
    for dev in [2, 3, 4] {
        let received = h.outbound[&dev].take_control();
        let mut expected = vec![(Signal::Backpressure, 1); 6];
        expected.push((Signal::CriticalBackpressure, 1));
        assert_eq!(signals(&received), expected);
    }
    assert_eq!(h.outbound[&1].num_control(), 0);
    assert_eq!(h.outbound[&1].num_data(), 16);

    let admission = h
        .switch
        .process_packet(2, data_packet(2000, 1, TrafficClass::Type1))
        .unwrap();
    assert_eq!(admission, Admission::Requeued);
    assert_eq!(h.inbound[&2].len(), 1);
    assert_eq!(h.outbound[&1].num_data(), 16);
    assert_eq!(
        count_matching(&h.test_tracker, "WARN: .*dropped due to buffer overflow"),
        1
    );

    let stats = h.switch.stats();
    assert_eq!(stats.admitted, 16);
    assert_eq!(stats.admitted_bits, 8192);
    assert_eq!(stats.requeued, 1);
    assert_eq!(stats.backpressure_signals, 6);
    assert_eq!(stats.critical_signals, 1);
}

#[test]
fn restore_broadcasts_per_threshold() {
    let h = switch_harness(file!(), &NetworkConfig::default());
    for i in 0..16 {
        h.switch
            .process_packet(3, data_packet(1000 + i, 1, TrafficClass::Type2))
            .unwrap();
    }
    for mailbox in h.outbound.values() {
        mailbox.take_control();
    }
    h.test_tracker.clear();

    let sent = h.switch.restore_tick();
    assert_eq!(
        sent,
        vec![
            (1, Signal::Restore),
            (2, Signal::Restore),
            (3, Signal::Restore),
            (4, Signal::Restore)
        ]
    );
    assert_eq!(h.switch.available(1), Some(5120));
    assert_eq!(h.switch.available(4), Some(4096 * 8));

    assert_eq!(
        count_matching(
            &h.test_tracker,
            "PROCESS: Restored buffer for Device 1 by 640 bytes. Current buffer size: 640 bytes"
        ),
        1
    );
    assert_eq!(count_matching(&h.test_tracker, "PROCESS: Restored buffer"), 4);

    // A destination never hears about itself
    let to_device1 = signals(&h.outbound[&1].take_control());
    assert_eq!(
        to_device1,
        vec![(Signal::Restore, 2), (Signal::Restore, 3), (Signal::Restore, 4)]
    );

    // Restoration never exceeds capacity
    h.switch.restore_tick();
    h.switch.restore_tick();
    assert_eq!(h.switch.available(1), Some(8192));
}

#[test]
fn restore_below_threshold_keeps_backpressure() {
    let config = NetworkConfig {
        process_rate: 1,
        ..Default::default()
    };
    let h = switch_harness(file!(), &config);
    for i in 0..16 {
        h.switch
            .process_packet(4, data_packet(1000 + i, 1, TrafficClass::Type1))
            .unwrap();
    }

    // 512 bits restored is below 15% of 8192
    let sent = h.switch.restore_tick();
    assert_eq!(sent[0], (1, Signal::Backpressure));
    assert_eq!(h.switch.available(1), Some(512));
}

#[test]
fn strict_priority_pass() {
    let config = NetworkConfig {
        policy: SchedulingPolicy::Strict,
        ..Default::default()
    };
    let h = switch_harness(file!(), &config);

    h.inbound[&2].push(data_packet(2222, 1, TrafficClass::Type2));
    h.inbound[&3].push(data_packet(3333, 1, TrafficClass::Type1));
    h.inbound[&4].push(data_packet(4444, 1, TrafficClass::Type1));
    h.inbound[&4].push(data_packet(4445, 1, TrafficClass::Type1));

    assert_eq!(h.switch.schedule_pass(), 3);
    let ids: Vec<PacketId> = h.outbound[&1].take_data(10).iter().map(|p| p.id).collect();
    assert_eq!(
        ids,
        vec![PacketId::Data(3333), PacketId::Data(4444), PacketId::Data(2222)]
    );
    assert_eq!(h.inbound[&4].len(), 1);
}

#[test]
fn unordered_pass_keeps_source_order() {
    let h = switch_harness(file!(), &NetworkConfig::default());

    h.inbound[&2].push(data_packet(2222, 1, TrafficClass::Type2));
    h.inbound[&3].push(data_packet(3333, 1, TrafficClass::Type1));
    h.inbound[&4].push(data_packet(4444, 2, TrafficClass::Type1));

    assert_eq!(h.switch.schedule_pass(), 3);
    let ids: Vec<PacketId> = h.outbound[&1].take_data(10).iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![PacketId::Data(2222), PacketId::Data(3333)]);
    assert_eq!(h.outbound[&2].num_data(), 1);
}

#[test]
fn faults_are_logged_and_pass_continues() {
    let h = switch_harness(file!(), &NetworkConfig::default());

    assert!(
        h.switch
            .process_packet(2, data_packet(1111, 9, TrafficClass::Type1))
            .is_err()
    );
    assert!(
        h.switch
            .process_packet(9, data_packet(1111, 1, TrafficClass::Type1))
            .is_err()
    );
    assert!(
        h.switch
            .process_packet(2, Packet::signal(Signal::Restore, 1))
            .is_err()
    );

    h.inbound[&2].push(data_packet(1111, 9, TrafficClass::Type1));
    h.inbound[&3].push(data_packet(3333, 1, TrafficClass::Type1));
    assert_eq!(h.switch.schedule_pass(), 2);
    assert_eq!(h.outbound[&1].num_data(), 1);
    assert_eq!(count_matching(&h.test_tracker, "ERROR: .*unknown Device 9"), 1);
}

#[test]
fn broadcast_excludes() {
    let h = switch_harness(file!(), &NetworkConfig::default());
    assert_eq!(h.switch.broadcast(Signal::Backpressure, 3, &[3]), 3);
    assert_eq!(h.switch.broadcast(Signal::Restore, 3, &[1, 3]), 2);
    assert_eq!(h.outbound[&3].num_control(), 0);
    assert_eq!(h.outbound[&2].num_control(), 2);
    assert!(h.outbound[&1].take_control().iter().all(Classify::is_control));
}

#[test]
fn credit_never_negative_and_nothing_lost() {
    let config = NetworkConfig {
        policy: SchedulingPolicy::Weighted,
        ..Default::default()
    };
    let h = switch_harness(file!(), &config);

    let mut num_sent = 0;
    for round in 0..20u32 {
        for (&source, queue) in &h.inbound {
            for dest in 1..=4 {
                if dest == source {
                    continue;
                }
                let class = if (round + dest as u32) % 2 == 0 {
                    TrafficClass::Type1
                } else {
                    TrafficClass::Type2
                };
                queue.push(data_packet(1000 + round, dest, class));
                num_sent += 1;
            }
        }
        for _ in 0..4 {
            h.switch.schedule_pass();
            for dest in 1..=4 {
                let credit = h.switch.credit(dest).unwrap();
                assert!(credit.available() <= credit.capacity());
            }
        }
        if round % 5 == 0 {
            h.switch.restore_tick();
        }
    }

    let delivered: usize = h.outbound.values().map(|m| m.num_data()).sum();
    assert_eq!(delivered + h.switch.num_queued(), num_sent);
    assert_eq!(h.switch.stats().admitted as usize, delivered);
}

#[test]
fn concurrent_admissions_stop_at_capacity() {
    const SENDERS: u32 = 17;

    for round in 0..10 {
        let h = switch_harness(file!(), &NetworkConfig::default());
        let barrier = Barrier::new(SENDERS as usize);

        let admissions: Vec<(usize, Admission)> = thread::scope(|s| {
            let handles: Vec<_> = (0..SENDERS)
                .map(|i| {
                    let (switch, barrier) = (&h.switch, &barrier);
                    let source = 2 + (i as usize % 3);
                    s.spawn(move || {
                        let packet = data_packet(3000 + i, 1, TrafficClass::Type1);
                        barrier.wait();
                        (source, switch.process_packet(source, packet).unwrap())
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        let admitted = admissions
            .iter()
            .filter(|(_, a)| matches!(a, Admission::Admitted { .. }))
            .count();
        assert_eq!(admitted, 16, "round {round}");
        assert_eq!(h.switch.available(1), Some(0));
        assert_eq!(h.outbound[&1].num_data(), 16);

        let rejected: Vec<usize> = admissions
            .iter()
            .filter(|(_, a)| *a == Admission::Requeued)
            .map(|(source, _)| *source)
            .collect();
        assert_eq!(rejected.len(), 1);
        for (dev, queue) in &h.inbound {
            let expected = usize::from(*dev == rejected[0]);
            assert_eq!(queue.len(), expected, "round {round}, Device {dev}");
        }

        for dev in [2, 3, 4] {
            let received = signals(&h.outbound[&dev].take_control());
            let critical = received
                .iter()
                .filter(|s| **s == (Signal::CriticalBackpressure, 1))
                .count();
            let backpressure = received
                .iter()
                .filter(|s| **s == (Signal::Backpressure, 1))
                .count();
            assert_eq!(critical, 1, "round {round}, Device {dev}");
            assert_eq!(backpressure, 6, "round {round}, Device {dev}");
        }
        assert_eq!(h.outbound[&1].num_control(), 0);
    }
}

#[test]
fn restore_races_admission_within_capacity() {
    const PACKETS: u32 = 200;

    let h = switch_harness(file!(), &NetworkConfig::default());
    let capacity = h.switch.credit(1).unwrap().capacity();

    let admitted = thread::scope(|s| {
        let sender = s.spawn(|| {
            let mut admitted = 0;
            for i in 0..PACKETS {
                let packet = data_packet(4000 + i, 1, TrafficClass::Type2);
                let admission = h.switch.process_packet(2, packet).unwrap();
                if let Admission::Admitted { remaining } = admission {
                    assert!(remaining <= capacity);
                    admitted += 1;
                }
            }
            admitted
        });
        s.spawn(|| {
            for _ in 0..50 {
                h.switch.restore_tick();
                assert!(h.switch.credit(1).unwrap().available() <= capacity);
            }
        });
        sender.join().unwrap()
    });

    assert!(h.switch.credit(1).unwrap().available() <= capacity);
    assert_eq!(admitted + h.inbound[&2].len(), PACKETS as usize);
    assert_eq!(h.switch.stats().admitted, admitted as u64);
}
