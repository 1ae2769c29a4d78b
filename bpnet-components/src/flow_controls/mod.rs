// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Flow-control components.

pub mod credit_pool;
