// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Models of a small network built around a credit-based switch.
//!
//! A number of [devices](device::Device) send packets to each other through
//! a central [switch](switch::Switch). The switch holds a credit pool per
//! destination and admits a packet only if the destination has enough credit
//! for it. As credit runs low the switch broadcasts
//! [signals](packet::Signal) to the other devices which adapt their sending
//! rates; the credit is restored periodically as the destination consumes
//! its receive buffer.
//!
//! The [network](network::Network) wires everything together from a
//! [`NetworkConfig`](config::NetworkConfig) and registers it with an
//! [`Engine`](bpnet_engine::engine::Engine).

pub mod config;
pub mod device;
pub mod network;
pub mod packet;
pub mod rate;
pub mod switch;
pub mod test_helpers;
pub mod traffic;
