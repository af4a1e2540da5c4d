//! Shared primitives: transitions, running statistics, target-network updates.

pub mod running_stats;
pub mod target_network;
pub mod transition;
