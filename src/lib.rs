//! # sac-rl: Soft Actor-Critic
//!
//! Off-policy maximum-entropy reinforcement learning for continuous,
//! bounded action spaces, built on [burn](https://burn.dev):
//!
//! - a squashed-Gaussian policy (scaled tanh transform with the exact
//!   change-of-variables log-density correction),
//! - twin Q critics with a polyak-averaged target copy kept outside the
//!   gradient graph,
//! - a uniform replay buffer carrying running observation statistics,
//! - a single-threaded online training loop interleaving environment
//!   interaction with periodic batched updates.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use burn::backend::{Autodiff, NdArray};
//! use sac_rl::{Sac, SacConfig, TrainOptions};
//!
//! type B = Autodiff<NdArray<f32>>;
//!
//! let config = SacConfig::new(3, 1, vec![2.0])
//!     .with_hidden_dim(128)
//!     .with_gamma(0.99)
//!     .with_norm_obs(true);
//!
//! let mut agent = Sac::<B>::new(config, &Default::default());
//! let (mut actor_optim, mut critic_optim) = agent.create_optimizers();
//!
//! let opts = TrainOptions::new()
//!     .with_epochs(50)
//!     .with_steps_per_epoch(4000)
//!     .with_num_eval_eps(5);
//!
//! let logger = agent.train_policy(
//!     &mut env, &mut eval_env, &opts,
//!     &mut actor_optim, &mut critic_optim,
//!     None, None,
//! );
//! ```

pub mod algorithms;
pub mod core;
pub mod environment;
pub mod metrics;
pub mod nn;
pub mod sac;

pub use crate::core::running_stats::{ObsNormalizer, RunningMeanStd};
pub use crate::core::target_network::polyak_update;
pub use crate::core::transition::{Rollout, Transition};
pub use algorithms::bounded::BoundedTanh;
pub use algorithms::policy::{log_prob_bounded, sample_action, sample_bounded};
pub use environment::{Environment, RewardFn, StepOutcome};
pub use metrics::StatsLogger;
pub use nn::{Activation, Mlp, MlpConfig, TwinQConfig, TwinQNet};
pub use sac::{Sac, SacConfig, TrainOptions};
