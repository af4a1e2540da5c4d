//! Agent configuration and training-loop schedule options.

use std::fmt;

use crate::nn::Activation;

/// Construction-time configuration for the agent.
///
/// Use [`SacConfig::new`] for defaults and the `with_*` builders to adjust.
#[derive(Debug, Clone)]
pub struct SacConfig {
    /// Observation dimension.
    pub obs_dim: usize,
    /// Action dimension.
    pub act_dim: usize,
    /// Per-dimension action limits; actions lie strictly inside
    /// `(-act_lim, act_lim)`.
    pub act_lim: Vec<f32>,
    /// Hidden width of the actor and critic networks.
    pub hidden_dim: usize,
    /// Number of hidden layers in the actor and critic networks.
    pub num_hidden: usize,
    /// Hidden-layer activation.
    pub activation: Activation,
    /// Discount factor.
    pub gamma: f32,
    /// Entropy temperature: weight on the policy log-probability term.
    pub beta: f32,
    /// Target-network averaging factor:
    /// `target = polyak * target + (1 - polyak) * live`.
    pub polyak: f32,
    /// Whether to standardize observations with the buffer's running
    /// statistics.
    pub norm_obs: bool,
    /// Replay buffer capacity.
    pub buffer_size: usize,
    /// Minibatch size for critic and actor updates.
    pub batch_size: usize,
    /// Alternating critic/actor micro-updates per gradient step.
    pub steps: usize,
    /// Learning rate for both optimizers.
    pub lr: f64,
    /// L2 weight decay for both optimizers (0 disables).
    pub decay: f64,
    /// Gradient norm clip for both optimizers (`None` disables).
    pub grad_clip: Option<f32>,
}

impl SacConfig {
    /// Create a configuration with default hyperparameters.
    pub fn new(obs_dim: usize, act_dim: usize, act_lim: Vec<f32>) -> Self {
        Self {
            obs_dim,
            act_dim,
            act_lim,
            hidden_dim: 64,
            num_hidden: 2,
            activation: Activation::Relu,
            gamma: 0.9,
            beta: 0.2,
            polyak: 0.995,
            norm_obs: false,
            buffer_size: 1_000_000,
            batch_size: 100,
            steps: 50,
            lr: 1e-3,
            decay: 0.0,
            grad_clip: None,
        }
    }

    /// Set the hidden width.
    pub fn with_hidden_dim(mut self, hidden_dim: usize) -> Self {
        self.hidden_dim = hidden_dim;
        self
    }

    /// Set the number of hidden layers.
    pub fn with_num_hidden(mut self, num_hidden: usize) -> Self {
        self.num_hidden = num_hidden;
        self
    }

    /// Set the hidden-layer activation.
    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    /// Set the discount factor.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the entropy temperature.
    pub fn with_beta(mut self, beta: f32) -> Self {
        self.beta = beta;
        self
    }

    /// Set the target-network averaging factor.
    pub fn with_polyak(mut self, polyak: f32) -> Self {
        self.polyak = polyak;
        self
    }

    /// Enable or disable observation normalization.
    pub fn with_norm_obs(mut self, norm_obs: bool) -> Self {
        self.norm_obs = norm_obs;
        self
    }

    /// Set the replay buffer capacity.
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Set the minibatch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the number of micro-updates per gradient step.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Set the learning rate.
    pub fn with_lr(mut self, lr: f64) -> Self {
        self.lr = lr;
        self
    }

    /// Set the weight decay.
    pub fn with_decay(mut self, decay: f64) -> Self {
        self.decay = decay;
        self
    }

    /// Set the gradient norm clip.
    pub fn with_grad_clip(mut self, grad_clip: Option<f32>) -> Self {
        self.grad_clip = grad_clip;
        self
    }
}

impl fmt::Display for SacConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sac(obs_dim={}, act_dim={}, hidden_dim={}, num_hidden={}, \
             gamma={}, beta={}, polyak={}, norm_obs={}, buffer_size={}, \
             batch_size={}, steps={}, lr={}, decay={}, grad_clip={:?})",
            self.obs_dim,
            self.act_dim,
            self.hidden_dim,
            self.num_hidden,
            self.gamma,
            self.beta,
            self.polyak,
            self.norm_obs,
            self.buffer_size,
            self.batch_size,
            self.steps,
            self.lr,
            self.decay,
            self.grad_clip,
        )
    }
}

/// Per-call schedule for the online training loop.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    /// Number of epochs after the warm-up phase.
    pub epochs: usize,
    /// Environment steps per epoch.
    pub steps_per_epoch: usize,
    /// Warm-up steps with uniform random actions before any training.
    pub update_after: usize,
    /// Environment steps between gradient steps (past warm-up).
    pub update_every: usize,
    /// Step cap per episode; reaching it flushes the episode as truncated.
    pub max_steps: usize,
    /// Evaluation rollouts per epoch (0 disables evaluation).
    pub num_eval_eps: usize,
    /// Print a rounded loss summary after each gradient step.
    pub verbose: bool,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            epochs: 10,
            steps_per_epoch: 1000,
            update_after: 1000,
            update_every: 50,
            max_steps: 500,
            num_eval_eps: 0,
            verbose: false,
        }
    }
}

impl TrainOptions {
    /// Create the default schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total environment steps the loop will run.
    pub fn total_steps(&self) -> usize {
        self.epochs * self.steps_per_epoch + self.update_after
    }

    /// Set the number of epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    /// Set the steps per epoch.
    pub fn with_steps_per_epoch(mut self, steps_per_epoch: usize) -> Self {
        self.steps_per_epoch = steps_per_epoch;
        self
    }

    /// Set the warm-up length.
    pub fn with_update_after(mut self, update_after: usize) -> Self {
        self.update_after = update_after;
        self
    }

    /// Set the training interval.
    pub fn with_update_every(mut self, update_every: usize) -> Self {
        self.update_every = update_every;
        self
    }

    /// Set the per-episode step cap.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Set the number of evaluation rollouts per epoch.
    pub fn with_num_eval_eps(mut self, num_eval_eps: usize) -> Self {
        self.num_eval_eps = num_eval_eps;
        self
    }

    /// Enable or disable loss printing.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}
