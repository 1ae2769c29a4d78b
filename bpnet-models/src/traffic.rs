// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Choice of traffic class for generated packets.

use crate::packet::TrafficClass;

/// Running counter that yields `ratio` type1 packets for every type2 packet.
///
/// While the counter is not positive a type1 packet is produced and the
/// counter incremented; otherwise a type2 packet is produced and `ratio`
/// subtracted. With `ratio == 1` the classes alternate.
#[derive(Clone, Debug)]
pub struct TrafficMix {
    counter: i64,
    ratio: i64,
}

impl TrafficMix {
    #[must_use]
    pub fn new(ratio: i64) -> Self {
        Self { counter: 0, ratio }
    }

    pub fn next_class(&mut self) -> TrafficClass {
        if self.counter <= 0 {
            self.counter += 1;
            TrafficClass::Type1
        } else {
            self.counter -= self.ratio;
            TrafficClass::Type2
        }
    }
}
