// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Traits used by components to classify the objects they carry.

use std::fmt;

/// Relative importance of an object when scheduling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    High,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Objects that are either control or data.
///
/// Control objects bypass credit accounting and travel in the control lane of
/// a [`Mailbox`](crate::mailbox::Mailbox).
pub trait Classify {
    fn is_control(&self) -> bool;
}

/// Objects that carry a scheduling priority.
pub trait Prioritised {
    fn priority(&self) -> Priority;
}
