//! Soft actor-critic: configuration, replay buffer, agent, and training
//! loop.

mod agent;
mod config;
mod replay;
mod trainer;


pub use agent::{entropy_actor_loss, td_targets, twin_critic_loss, Sac};
pub use config::{SacConfig, TrainOptions};
pub use replay::{ReplayBatch, ReplayBuffer};
