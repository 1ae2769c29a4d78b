// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::time::Duration;

use bpnet_engine::run_simulation;
use bpnet_engine::test_helpers::start_test;
use bpnet_models::config::{NetworkConfig, SchedulingPolicy, Timing};
use bpnet_models::network::Network;
use bpnet_track::test_helpers::count_matching;

fn fast_config(policy: SchedulingPolicy, ratio: i64) -> NetworkConfig {
    NetworkConfig {
        policy,
        ratio,
        timing: Timing {
            time_unit_ms: 20,
            switch_poll_ms: 1,
            alert_poll_us: 100,
        },
        ..Default::default()
    }
}

fn run(config: &NetworkConfig) {
    let (test_tracker, engine) = start_test(file!());
    let network = Network::new_and_register(&engine, config).unwrap();
    run_simulation!(engine, Duration::from_millis(300));

    let switch = network.switch();
    let stats = switch.stats();
    assert!(stats.admitted > 0);

    let sent: usize = network.devices().iter().map(|d| d.num_sent()).sum();
    let processed: usize = network.devices().iter().map(|d| d.num_processed()).sum();
    let buffered: usize = network
        .devices()
        .iter()
        .map(|d| d.receive_buffer().num_data())
        .sum();

    // Every packet is either delivered or still waiting at the switch
    assert_eq!(processed + buffered, stats.admitted as usize);
    assert_eq!(stats.admitted as usize + switch.num_queued(), sent);

    for device in network.devices() {
        let credit = switch.credit(device.id()).unwrap();
        assert!(credit.available() <= credit.capacity());
        for (dest, rate) in device.rates().snapshot() {
            assert!(rate <= device.rates().base(dest).unwrap());
        }
    }

    for name in ["Device1Sender", "Device4AlertHandler", "SwitchListener", "BufferRestorer"] {
        assert_eq!(count_matching(&test_tracker, &format!("Joined {name}")), 1);
    }
}

#[test]
fn equal_traffic() {
    run(&fast_config(SchedulingPolicy::Unordered, 1));
}

#[test]
fn strict_priority() {
    run(&fast_config(SchedulingPolicy::Strict, 4));
}

#[test]
fn threshold_priority() {
    run(&fast_config(SchedulingPolicy::Threshold, 4));
}

#[test]
fn weighted_priority() {
    run(&fast_config(SchedulingPolicy::Weighted, 4));
}

#[test]
fn congestion_is_signalled() {
    let (test_tracker, engine) = start_test(file!());
    let config = fast_config(SchedulingPolicy::Unordered, 1);
    let network = Network::new_and_register(&engine, &config).unwrap();
    run_simulation!(engine, Duration::from_millis(300));

    // Device 1 receives 30 packets per time unit but can only buffer 16
    let stats = network.switch().stats();
    assert!(stats.backpressure_signals > 0);
    assert!(count_matching(&test_tracker, "WARN: .*Slowing down transmission to Device 1") > 0);
}

#[test]
fn invalid_config_is_rejected() {
    let (_test_tracker, engine) = start_test(file!());
    let mut config = NetworkConfig::default();
    config.devices[1].rates[0].dest = 2;
    assert!(Network::new_and_register(&engine, &config).is_err());
}
