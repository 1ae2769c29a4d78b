// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

//! Build a complete network from its configuration.

use std::sync::Arc;

use bpnet_components::mailbox::Mailbox;
use bpnet_components::queue::Queue;
use bpnet_engine::engine::Engine;
use bpnet_engine::types::SimError;
use bpnet_track::info;

use crate::config::NetworkConfig;
use crate::device::Device;
use crate::packet::DeviceId;
use crate::switch::{Switch, SwitchPort};

pub struct Network {
    switch: Arc<Switch>,
    devices: Vec<Arc<Device>>,
}

impl Network {
    /// Validate `config`, create every device and the switch, connect them
    /// and register them with `engine`.
    pub fn new_and_register(engine: &Engine, config: &NetworkConfig) -> Result<Self, SimError> {
        config.validate()?;
        let top = engine.top();

        let mut ports = Vec::with_capacity(config.devices.len());
        let mut devices = Vec::with_capacity(config.devices.len());
        for device in &config.devices {
            let inbound = Arc::new(Queue::new(top, &format!("uplink{}", device.id)));
            let outbound = Arc::new(Mailbox::new(top, &format!("rx_buffer{}", device.id)));

            devices.push(Device::new_and_register(
                engine,
                top,
                device,
                config,
                inbound.clone(),
                outbound.clone(),
            )?);
            ports.push(SwitchPort {
                device: device.id,
                inbound,
                outbound,
                buffer_bits: device.buffer_bits,
            });
        }

        let switch = Switch::new_and_register(engine, top, config, ports)?;
        info!(top ; "Network of {} devices, {} policy, ratio {}", devices.len(), config.policy, config.ratio);
        Ok(Self { switch, devices })
    }

    #[must_use]
    pub fn switch(&self) -> &Arc<Switch> {
        &self.switch
    }

    #[must_use]
    pub fn devices(&self) -> &[Arc<Device>] {
        &self.devices
    }

    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.id() == id)
    }
}
