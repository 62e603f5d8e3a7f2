//! # swimraft-engine::node
//!
//! This module contains the node runtime and timer management.

pub mod runtime;
pub mod timers;

pub use runtime::{Node, NodeStatus};
