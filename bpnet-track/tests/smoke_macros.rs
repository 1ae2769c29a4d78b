// Copyright (c) 2020 Graphcore Ltd. All rights reserved.

//! Ensure that all version of each macro can be used

use std::sync::Arc;

use bpnet_track::entity::{Entity, toplevel};
use bpnet_track::{Id, Track, debug, error, info, process, test_helpers, test_init, trace, warn};

macro_rules! build_with_entity {
    ($name:ident, $macro:ident, $slvl:expr) => (
        #[test]
        fn $name() {
            let (test_tracker, tracker) = test_init!(100);

            let top = toplevel(&tracker, "top");
            assert_eq!(top.id, Id(100));
            assert!(test_tracker.events().is_empty());

            $macro!(top ; "Loc with no args");
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl, ": Loc with no args")]);

            $macro!(top ; "Loc with {} argument", 1);
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl, ": Loc with 1 argument")]);

            $macro!(top ; "Loc with {}, {} arguments", 1, 1 + 1);
            test_helpers::check_and_clear(&test_tracker, &[concat!("100:", $slvl,": Loc with 1, 2 arguments")]);
        }
    );
}

build_with_entity!(trace_with_entity, trace, "TRACE");
build_with_entity!(info_with_entity, info, "INFO");
build_with_entity!(debug_with_entity, debug, "DEBUG");
build_with_entity!(warn_with_entity, warn, "WARN");
build_with_entity!(error_with_entity, error, "ERROR");
build_with_entity!(process_with_entity, process, "PROCESS");

#[test]
fn hierarchy() {
    let (test_tracker, tracker) = test_init!(10);

    let top = toplevel(&tracker, "top");
    let switch = Arc::new(Entity::new(&top, "switch"));
    let uplink = Entity::new(&switch, "uplink1");
    assert_eq!((top.id, switch.id, uplink.id), (Id(10), Id(11), Id(12)));

    assert_eq!(switch.full_name(), "top::switch");
    assert_eq!(format!("{uplink}"), "top::switch::uplink1");

    warn!(uplink ; "queue growing");
    test_helpers::check_and_clear(&test_tracker, &["12:WARN: queue growing"]);
}

#[test]
fn events_from_threads() {
    let (test_tracker, tracker) = test_init!(1);
    let top = toplevel(&tracker, "top");

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let entity = Arc::new(Entity::new(&top, &format!("device{i}")));
            std::thread::spawn(move || {
                for j in 0..5 {
                    info!(entity ; "message {j}");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(test_helpers::count_matching(&test_tracker, ":INFO: message"), 20);
}

#[test]
fn dev_null_accepts_everything() {
    let tracker = bpnet_track::tracker::dev_null_tracker();
    let top = toplevel(&tracker, "top");
    let device = Entity::new(&top, "device1");
    assert!(!tracker.is_entity_enabled(device.id, log::Level::Error));
    error!(device ; "dropped");
    process!(device ; "dropped");
}
