// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! A library of components that are shared by the switch simulation models.
//!
//! Unlike the models themselves these components know nothing about devices
//! or signals; they are generic over the object being moved and rely on the
//! traits in [`types`] to classify objects.
//!
//! - [`queue::Queue`]: a thread-safe FIFO.
//! - [`mailbox::Mailbox`]: a FIFO with separate control and data lanes where
//!   the control lane can be waited on.
//! - [`flow_controls::credit_pool::CreditPool`]: a bounded pool of credit.
//! - [`arbiter`]: policies that order a batch of objects competing for the
//!   same destination.

pub mod arbiter;
pub mod flow_controls;
pub mod mailbox;
pub mod queue;
pub mod types;
