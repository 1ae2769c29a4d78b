// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::io::Write;

use bpnet_models::config::SchedulingPolicy;
use clap::Parser;
use serial_test::serial;
use sim_network::{Cli, PriorityPolicy, Settings, TrafficState};

fn parse(args: &[&str]) -> Cli {
    Cli::parse_from(std::iter::once("sim-network").chain(args.iter().copied()))
}

#[test]
#[serial]
fn defaults() {
    let settings = Settings::load(&parse(&[])).unwrap();
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.simulation_log, "simulation.log");
    assert_eq!(settings.processed_log, "processed.log");

    let config = settings.network_config().unwrap();
    assert_eq!(config.ratio, 1);
    assert_eq!(config.policy, SchedulingPolicy::Unordered);
    assert_eq!(config.devices.len(), 4);
}

#[test]
#[serial]
fn prioritised_state() {
    let cli = parse(&["--state", "prioritised", "--priority-policy", "weighted"]);
    let settings = Settings::load(&cli).unwrap();
    assert_eq!(settings.state, Some(TrafficState::Prioritised));
    assert_eq!(settings.priority_policy, PriorityPolicy::Weighted);

    let config = settings.network_config().unwrap();
    assert_eq!(config.ratio, 4);
    assert_eq!(config.policy, SchedulingPolicy::Weighted);
}

#[test]
#[serial]
fn explicit_ratio_beats_state() {
    let cli = parse(&["--state", "prioritised", "--ratio", "3"]);
    let config = Settings::load(&cli).unwrap().network_config().unwrap();
    assert_eq!(config.ratio, 3);
    assert_eq!(config.policy, SchedulingPolicy::Strict);
}

#[test]
#[serial]
fn threshold_overrides() {
    let cli = parse(&[
        "--backpressure-threshold",
        "0.5",
        "--restore-threshold",
        "0.2",
        "--priority-threshold",
        "0.05",
        "--time-unit-ms",
        "50",
        "--seed",
        "9",
    ]);
    let config = Settings::load(&cli).unwrap().network_config().unwrap();
    assert_eq!(config.thresholds.backpressure, 0.5);
    assert_eq!(config.thresholds.restore, 0.2);
    assert_eq!(config.thresholds.priority, 0.05);
    assert_eq!(config.timing.time_unit_ms, 50);
    assert_eq!(config.seed, 9);
}

#[test]
#[serial]
fn invalid_values_are_rejected() {
    let cli = parse(&["--backpressure-threshold", "1.5"]);
    assert!(Settings::load(&cli).unwrap().network_config().is_err());

    let cli = parse(&["--duration", "0"]);
    assert!(Settings::load(&cli).unwrap().network_config().is_err());

    let cli = parse(&["--ratio", "0"]);
    assert!(Settings::load(&cli).unwrap().network_config().is_err());
}

#[test]
#[serial]
fn conf_file_is_merged() {
    let mut conf = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        conf,
        r#"
duration = 20
state = "prioritised"
priority_policy = "threshold"
log_level = "debug"

[network]
process_rate = 8

[[network.devices]]
id = 1
buffer_bits = 4096
rates = [{{ dest = 2, packets = 5 }}]

[[network.devices]]
id = 2
buffer_bits = 8192
rates = [{{ dest = 1, packets = 7 }}]
"#
    )
    .unwrap();

    let path = conf.path().to_str().unwrap().to_string();
    let settings = Settings::load(&parse(&["--conf-file", &path])).unwrap();
    assert_eq!(settings.duration, 20);
    assert_eq!(settings.log_level, log::Level::Debug);

    let config = settings.network_config().unwrap();
    assert_eq!(config.policy, SchedulingPolicy::Threshold);
    assert_eq!(config.process_rate, 8);
    assert_eq!(config.devices.len(), 2);
    assert_eq!(config.devices[1].rates[0].packets, 7);
    assert_eq!(config.packet_size_bits, 512);

    // The command line has the final say
    let settings = Settings::load(&parse(&["--conf-file", &path, "--duration", "3"])).unwrap();
    assert_eq!(settings.duration, 3);
}

#[test]
#[serial]
fn missing_conf_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.toml");
    let cli = parse(&["--conf-file", path.to_str().unwrap()]);
    assert!(Settings::load(&cli).is_err());
}

#[test]
#[serial]
fn environment_overrides_defaults() {
    // SAFETY: tests touching the environment are serialised.
    unsafe {
        std::env::set_var("BPNET_DURATION", "7");
        std::env::set_var("BPNET_STATE", "prioritised");
        std::env::set_var("BPNET_NETWORK__PROCESS_RATE", "5");
    }

    let from_env = Settings::load(&parse(&[]));
    let from_cli = Settings::load(&parse(&["--duration", "2"]));

    unsafe {
        std::env::remove_var("BPNET_DURATION");
        std::env::remove_var("BPNET_STATE");
        std::env::remove_var("BPNET_NETWORK__PROCESS_RATE");
    }

    let settings = from_env.unwrap();
    assert_eq!(settings.duration, 7);
    assert_eq!(settings.state, Some(TrafficState::Prioritised));
    assert_eq!(settings.network.process_rate, 5);

    assert_eq!(from_cli.unwrap().duration, 2);
}
