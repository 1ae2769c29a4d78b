// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

use std::sync::Arc;

use bpnet_track::test_helpers::{TestTracker, create_tracker};

use crate::engine::Engine;

/// Create an engine whose events are captured by a [`TestTracker`].
#[must_use]
pub fn start_test(full_filepath: &str) -> (Arc<TestTracker>, Engine) {
    let (test_tracker, tracker) = create_tracker(full_filepath);
    (test_tracker, Engine::new(&tracker))
}
