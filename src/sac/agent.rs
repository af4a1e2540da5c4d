//! The soft actor-critic agent: losses, gradient updates, target smoothing.
//!
//! Off-policy maximum-entropy learning with:
//! - a squashed-Gaussian policy over bounded actions,
//! - twin Q critics trained toward a shared Bellman target,
//! - a frozen target critic blended by polyak averaging.
//!
//! ```text
//! Per micro-update:
//!
//! 1. CRITIC: y = r + γ(1-d)(min_Q_target(s',a') - β·log π(a'|s'))
//!            minimize (MSE(Q1, y) + MSE(Q2, y)) / 2
//!
//! 2. ACTOR:  minimize E[β·log π(a|s) - min_Q(s, a)],  a ~ π(·|s)
//!
//! 3. TARGET: θ_target ← polyak·θ_target + (1-polyak)·θ_live
//! ```
//!
//! Target computation runs entirely on the non-autodiff backend, so the
//! target critic and the sampled next actions never enter the gradient
//! graph. Each optimizer steps only the gradients extracted for its own
//! module, which keeps the actor and critic updates from touching each
//! other's parameters.

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::decay::WeightDecayConfig;
use burn::optim::{AdamConfig, GradientsParams, Optimizer};
use burn::tensor::backend::{AutodiffBackend, Backend};
use burn::tensor::Tensor;

use crate::algorithms::bounded::BoundedTanh;
use crate::algorithms::policy::sample_action;
use crate::core::running_stats::ObsNormalizer;
use crate::core::target_network::polyak_update;
use crate::core::transition::Transition;
use crate::environment::RewardFn;
use crate::metrics::StatsLogger;
use crate::nn::{Mlp, MlpConfig, TwinQConfig, TwinQNet};

use super::config::SacConfig;
use super::replay::{ReplayBatch, ReplayBuffer};

/// Soft actor-critic agent.
pub struct Sac<B: AutodiffBackend> {
    pub(crate) config: SacConfig,
    pub(crate) device: B::Device,
    pub(crate) actor: Mlp<B>,
    pub(crate) critic: TwinQNet<B>,
    pub(crate) target_critic: TwinQNet<B::InnerBackend>,
    pub(crate) bound: BoundedTanh,
    pub(crate) normalizer: ObsNormalizer,
    pub(crate) replay: ReplayBuffer,
}

impl<B: AutodiffBackend> Sac<B> {
    /// Create an agent from its configuration.
    ///
    /// # Panics
    /// Panics if `act_lim` does not have `act_dim` entries.
    pub fn new(config: SacConfig, device: &B::Device) -> Self {
        assert_eq!(
            config.act_lim.len(),
            config.act_dim,
            "act_lim must have one entry per action dimension"
        );

        let actor = MlpConfig::new(
            config.obs_dim,
            config.act_dim * 2,
            config.hidden_dim,
            config.num_hidden,
            config.activation,
        )
        .init(device);

        let critic = TwinQConfig::new(
            config.obs_dim,
            config.act_dim,
            config.hidden_dim,
            config.num_hidden,
            config.activation,
        )
        .init(device);

        // Copy-then-freeze: the target lives on the non-autodiff backend
        // and is only ever mutated by the polyak blend.
        let target_critic = critic.valid();

        let bound = BoundedTanh::new(config.act_lim.clone());
        let normalizer = ObsNormalizer::new(config.obs_dim, config.norm_obs);
        let replay = ReplayBuffer::new(config.obs_dim, config.act_dim, config.buffer_size);

        Self {
            config,
            device: device.clone(),
            actor,
            critic,
            target_critic,
            bound,
            normalizer,
            replay,
        }
    }

    /// The agent's configuration.
    pub fn config(&self) -> &SacConfig {
        &self.config
    }

    /// The bounded action transform.
    pub fn bound(&self) -> &BoundedTanh {
        &self.bound
    }

    /// The replay buffer.
    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    /// Mutable access to the replay buffer (reseeding, inspection).
    pub fn replay_mut(&mut self) -> &mut ReplayBuffer {
        &mut self.replay
    }

    /// Store a transition in the replay buffer.
    pub fn store_transition(&mut self, transition: Transition) {
        self.replay.append(transition);
    }

    /// Finalize an episode boundary in the replay buffer.
    pub fn finish_episode(&mut self) {
        self.replay.push();
    }

    /// Create the actor and critic Adam optimizers configured with the
    /// agent's learning rate, weight decay, and gradient clipping.
    pub fn create_optimizers(
        &self,
    ) -> (
        impl Optimizer<Mlp<B>, B>,
        impl Optimizer<TwinQNet<B>, B>,
    ) {
        let mut adam = AdamConfig::new().with_epsilon(1e-5);
        if self.config.decay > 0.0 {
            adam = adam.with_weight_decay(Some(WeightDecayConfig::new(self.config.decay as f32)));
        }
        if let Some(max_norm) = self.config.grad_clip {
            adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(max_norm)));
        }
        (adam.init(), adam.init())
    }

    /// Pull the buffer's running statistics into the normalization
    /// snapshot. A no-op when observation normalization is disabled.
    pub fn update_normalization_stats(&mut self) {
        if self.config.norm_obs {
            self.normalizer.refresh(self.replay.statistics());
        }
    }

    /// Standardize a single observation with the current snapshot.
    pub fn normalize_obs(&self, obs: &[f32]) -> Vec<f32> {
        self.normalizer.normalize(obs)
    }

    /// Sample `(action, log_prob)` from the current policy on the autodiff
    /// backend. Gradients flow through the sample.
    pub fn sample_action(&self, obs_norm: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 1>) {
        sample_action(&self.actor, obs_norm, &self.bound)
    }

    /// Choose an action for a raw observation, with gradients disabled.
    pub fn choose_action(&self, obs: &[f32]) -> Vec<f32> {
        let obs_norm = self.normalizer.normalize(obs);
        let obs_t = Tensor::<B::InnerBackend, 1>::from_floats(obs_norm.as_slice(), &self.device)
            .reshape([1, self.config.obs_dim]);

        let (action, _) = sample_action(&self.actor.valid(), obs_t, &self.bound);
        action.into_data().as_slice::<f32>().unwrap().to_vec()
    }

    /// Critic loss on a fresh minibatch.
    ///
    /// The Bellman target is computed on the non-autodiff backend and
    /// enters the loss as a constant. When `rwd_fn` is supplied it replaces
    /// the stored rewards.
    pub fn compute_critic_loss(
        &mut self,
        rwd_fn: Option<&dyn RewardFn<B::InnerBackend>>,
    ) -> Tensor<B, 1> {
        let batch = self.replay.sample(self.config.batch_size);
        let q_target = self.bellman_targets(&batch, rwd_fn);

        let (obs_t, act_t) = self.batch_inputs::<B>(&batch);
        let (q1, q2) = self.critic.forward(obs_t, act_t);

        twin_critic_loss(
            q1.flatten(0, 1),
            q2.flatten(0, 1),
            Tensor::from_inner(q_target),
        )
    }

    /// Actor loss on a fresh minibatch: entropy-regularized negative value.
    pub fn compute_actor_loss(&mut self) -> Tensor<B, 1> {
        let batch = self.replay.sample(self.config.batch_size);
        let (obs_t, _) = self.batch_inputs::<B>(&batch);

        let (act, logp) = self.sample_action(obs_t.clone());
        let (q1, q2) = self.critic.forward(obs_t, act);
        let min_q = q1.flatten(0, 1).min_pair(q2.flatten(0, 1));

        entropy_actor_loss(min_q, logp, self.config.beta)
    }

    /// Run `steps` alternating critic/actor updates, blending the target
    /// critic after each pair. Returns the mean `(actor_loss, critic_loss)`
    /// across the micro-updates; both are also pushed to `logger` per
    /// micro-update when supplied.
    pub fn take_policy_gradient_step<AO, CO>(
        &mut self,
        actor_optim: &mut AO,
        critic_optim: &mut CO,
        rwd_fn: Option<&dyn RewardFn<B::InnerBackend>>,
        mut logger: Option<&mut StatsLogger>,
    ) -> (f64, f64)
    where
        AO: Optimizer<Mlp<B>, B>,
        CO: Optimizer<TwinQNet<B>, B>,
    {
        let mut actor_loss_sum = 0.0;
        let mut critic_loss_sum = 0.0;

        for _ in 0..self.config.steps {
            // Critic update. Extracting gradients for the critic alone
            // discards any gradient reaching other modules.
            let critic_loss = self.compute_critic_loss(rwd_fn);
            let critic_loss_val = scalar(&critic_loss);
            let grads = GradientsParams::from_grads(critic_loss.backward(), &self.critic);
            self.critic = critic_optim.step(self.config.lr, self.critic.clone(), grads);

            // Actor update. The actor loss backpropagates through the live
            // critic, but only the actor's own gradients are applied.
            let actor_loss = self.compute_actor_loss();
            let actor_loss_val = scalar(&actor_loss);
            let grads = GradientsParams::from_grads(actor_loss.backward(), &self.actor);
            self.actor = actor_optim.step(self.config.lr, self.actor.clone(), grads);

            // Target blend, outside the gradient graph.
            self.target_critic = polyak_update(
                &self.critic.valid(),
                self.target_critic.clone(),
                self.config.polyak,
            );

            if let Some(lg) = logger.as_deref_mut() {
                lg.push(&[("actor_loss", actor_loss_val), ("critic_loss", critic_loss_val)]);
            }

            actor_loss_sum += actor_loss_val;
            critic_loss_sum += critic_loss_val;
        }

        let n = self.config.steps.max(1) as f64;
        (actor_loss_sum / n, critic_loss_sum / n)
    }

    /// Bellman targets for a batch, computed without gradient tracking.
    fn bellman_targets(
        &self,
        batch: &ReplayBatch,
        rwd_fn: Option<&dyn RewardFn<B::InnerBackend>>,
    ) -> Tensor<B::InnerBackend, 1> {
        let n = batch.len();
        let device = &self.device;

        let next_obs_norm = self.normalizer.normalize_batch(&batch.next_obs);
        let next_obs_t = Tensor::<B::InnerBackend, 1>::from_floats(next_obs_norm.as_slice(), device)
            .reshape([n, self.config.obs_dim]);

        let (next_act, next_logp) =
            sample_action(&self.actor.valid(), next_obs_t.clone(), &self.bound);
        let (q1_next, q2_next) = self.target_critic.forward(next_obs_t, next_act);
        let q_next = q1_next.flatten(0, 1).min_pair(q2_next.flatten(0, 1));

        let rwd_t = match rwd_fn {
            Some(f) => {
                let (obs_t, act_t) = self.batch_inputs::<B::InnerBackend>(batch);
                f.reward(obs_t, act_t)
            }
            None => Tensor::from_floats(batch.rwd.as_slice(), device),
        };
        let done_t = Tensor::from_floats(batch.done.as_slice(), device);

        td_targets(
            rwd_t,
            done_t,
            q_next,
            next_logp,
            self.config.gamma,
            self.config.beta,
        )
    }

    /// Normalized observation and action tensors for a batch, on any
    /// backend sharing the agent's device type.
    fn batch_inputs<Ba>(&self, batch: &ReplayBatch) -> (Tensor<Ba, 2>, Tensor<Ba, 2>)
    where
        Ba: Backend<Device = B::Device>,
    {
        let n = batch.len();
        let obs_norm = self.normalizer.normalize_batch(&batch.obs);

        let obs_t = Tensor::<Ba, 1>::from_floats(obs_norm.as_slice(), &self.device)
            .reshape([n, self.config.obs_dim]);
        let act_t = Tensor::<Ba, 1>::from_floats(batch.act.as_slice(), &self.device)
            .reshape([n, self.config.act_dim]);
        (obs_t, act_t)
    }
}

/// Bellman target: `y = r + γ(1-d)(q_next - β·logp)`.
pub fn td_targets<B: Backend>(
    rwd: Tensor<B, 1>,
    done: Tensor<B, 1>,
    q_next: Tensor<B, 1>,
    next_logp: Tensor<B, 1>,
    gamma: f32,
    beta: f32,
) -> Tensor<B, 1> {
    let v_next = q_next - next_logp.mul_scalar(beta);
    let not_done = done.mul_scalar(-1.0).add_scalar(1.0);
    rwd + not_done.mul_scalar(gamma) * v_next
}

/// Averaged squared Bellman error over both Q heads:
/// `(MSE(q1, y) + MSE(q2, y)) / 2`. Symmetric in the two heads.
pub fn twin_critic_loss<B: Backend>(
    q1: Tensor<B, 1>,
    q2: Tensor<B, 1>,
    targets: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let q1_loss = (q1 - targets.clone()).powf_scalar(2.0).mean();
    let q2_loss = (q2 - targets).powf_scalar(2.0).mean();
    (q1_loss + q2_loss).mul_scalar(0.5)
}

/// Entropy-regularized policy loss: `mean(β·logp - min_q)`.
pub fn entropy_actor_loss<B: Backend>(
    min_q: Tensor<B, 1>,
    logp: Tensor<B, 1>,
    beta: f32,
) -> Tensor<B, 1> {
    (logp.mul_scalar(beta) - min_q).mean()
}

fn scalar<B: Backend>(t: &Tensor<B, 1>) -> f64 {
    t.clone().into_data().as_slice::<f32>().unwrap()[0] as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::target_network::flatten_params;
    use burn::backend::{Autodiff, NdArray};

    type TB = Autodiff<NdArray<f32>>;
    type Inner = NdArray<f32>;

    fn device() -> <TB as Backend>::Device {
        Default::default()
    }

    fn small_config() -> SacConfig {
        SacConfig::new(3, 1, vec![1.0])
            .with_hidden_dim(16)
            .with_num_hidden(1)
            .with_batch_size(8)
            .with_steps(1)
    }

    fn seeded_agent(config: SacConfig) -> Sac<TB> {
        TB::seed(0);
        let mut agent = Sac::<TB>::new(config, &device());
        agent.replay_mut().seed(42);

        for i in 0..20 {
            let x = (i as f32) * 0.1 - 1.0;
            agent.store_transition(Transition::new(
                vec![x, x * 0.5, -x],
                vec![(x * 0.3).clamp(-0.9, 0.9)],
                vec![x + 0.1, x * 0.5 + 0.1, -x - 0.1],
                x * 0.2,
                i == 19,
                false,
            ));
        }
        agent.finish_episode();
        agent
    }

    #[test]
    fn test_td_targets_values() {
        let device = device();
        let rwd: Tensor<TB, 1> = Tensor::from_floats([1.0, 1.0], &device);
        let done: Tensor<TB, 1> = Tensor::from_floats([0.0, 1.0], &device);
        let q_next: Tensor<TB, 1> = Tensor::from_floats([10.0, 10.0], &device);
        let logp: Tensor<TB, 1> = Tensor::from_floats([-1.0, -1.0], &device);

        let targets = td_targets(rwd, done, q_next, logp, 0.9, 0.2);
        let data = targets.into_data();
        let slice = data.as_slice::<f32>().unwrap();

        // Non-terminal: 1 + 0.9 * (10 - 0.2*(-1)) = 10.18
        assert!((slice[0] - 10.18).abs() < 1e-4);
        // Terminal: bootstrap masked out.
        assert!((slice[1] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_twin_critic_loss_symmetric_in_heads() {
        let device = device();
        let q1: Tensor<TB, 1> = Tensor::from_floats([1.0, 2.0, 3.0], &device);
        let q2: Tensor<TB, 1> = Tensor::from_floats([0.5, 2.5, 2.0], &device);
        let targets: Tensor<TB, 1> = Tensor::from_floats([1.5, 2.0, 2.5], &device);

        let a = scalar(&twin_critic_loss(q1.clone(), q2.clone(), targets.clone()));
        let b = scalar(&twin_critic_loss(q2, q1, targets));
        assert!((a - b).abs() < 1e-7);
    }

    #[test]
    fn test_entropy_actor_loss_value() {
        let device = device();
        let min_q: Tensor<TB, 1> = Tensor::from_floats([10.0, 10.0], &device);
        let logp: Tensor<TB, 1> = Tensor::from_floats([-1.0, -1.0], &device);

        // mean(0.2*(-1) - 10) = -10.2
        let loss = scalar(&entropy_actor_loss(min_q, logp, 0.2));
        assert!((loss + 10.2).abs() < 1e-5);
    }

    #[test]
    fn test_losses_are_finite() {
        let mut agent = seeded_agent(small_config());

        let critic_loss = scalar(&agent.compute_critic_loss(None));
        let actor_loss = scalar(&agent.compute_actor_loss());

        assert!(critic_loss.is_finite());
        assert!(critic_loss >= 0.0);
        assert!(actor_loss.is_finite());
    }

    #[test]
    fn test_reward_override_changes_targets() {
        let mut agent = seeded_agent(small_config());

        // A constant huge reward must move the critic loss.
        let rwd_fn = |obs: Tensor<Inner, 2>, _act: Tensor<Inner, 2>| -> Tensor<Inner, 1> {
            let [n, _] = obs.dims();
            Tensor::ones([n], &Default::default()) * 100.0
        };

        agent.replay_mut().seed(7);
        let base = scalar(&agent.compute_critic_loss(None));
        agent.replay_mut().seed(7);
        let overridden = scalar(&agent.compute_critic_loss(Some(&rwd_fn)));

        assert!((overridden - base).abs() > 1.0);
    }

    #[test]
    fn test_choose_action_within_limits() {
        let agent = seeded_agent(small_config());

        for _ in 0..20 {
            let action = agent.choose_action(&[0.1, -0.2, 0.3]);
            assert_eq!(action.len(), 1);
            assert!(action[0].abs() < 1.0);
        }
    }

    #[test]
    fn test_actor_step_does_not_touch_critic_and_vice_versa() {
        let mut agent = seeded_agent(small_config());
        let (mut actor_optim, mut critic_optim) = agent.create_optimizers();

        let critic_before = flatten_params::<TB, _>(&agent.critic);
        let actor_before = flatten_params::<TB, _>(&agent.actor);

        // Actor-only step.
        let loss = agent.compute_actor_loss();
        let grads = GradientsParams::from_grads(loss.backward(), &agent.actor);
        agent.actor = actor_optim.step(agent.config.lr, agent.actor.clone(), grads);

        assert_eq!(flatten_params::<TB, _>(&agent.critic), critic_before);
        assert_ne!(flatten_params::<TB, _>(&agent.actor), actor_before);

        // Critic-only step.
        let actor_after = flatten_params::<TB, _>(&agent.actor);
        let loss = agent.compute_critic_loss(None);
        let grads = GradientsParams::from_grads(loss.backward(), &agent.critic);
        agent.critic = critic_optim.step(agent.config.lr, agent.critic.clone(), grads);

        assert_eq!(flatten_params::<TB, _>(&agent.actor), actor_after);
        assert_ne!(flatten_params::<TB, _>(&agent.critic), critic_before);
    }

    #[test]
    fn test_target_follows_exact_polyak_blend() {
        let mut agent = seeded_agent(small_config());
        let (mut actor_optim, mut critic_optim) = agent.create_optimizers();
        let polyak = agent.config.polyak;

        let target_old = flatten_params::<Inner, _>(&agent.target_critic);
        agent.take_policy_gradient_step(&mut actor_optim, &mut critic_optim, None, None);

        let live_new = flatten_params::<Inner, _>(&agent.critic.valid());
        let target_new = flatten_params::<Inner, _>(&agent.target_critic);

        for ((t_new, t_old), live) in target_new
            .iter()
            .zip(target_old.iter())
            .zip(live_new.iter())
        {
            for i in 0..t_new.len() {
                let expected = polyak * t_old[i] + (1.0 - polyak) * live[i];
                assert!(
                    (t_new[i] - expected).abs() < 1e-5,
                    "target parameter drifted from the polyak blend: \
                     {} vs {expected}",
                    t_new[i]
                );
            }
        }
    }

    #[test]
    fn test_gradient_step_reports_and_logs_losses() {
        let mut agent = seeded_agent(small_config().with_steps(3));
        let (mut actor_optim, mut critic_optim) = agent.create_optimizers();
        let mut logger = StatsLogger::new();

        let (actor_loss, critic_loss) = agent.take_policy_gradient_step(
            &mut actor_optim,
            &mut critic_optim,
            None,
            Some(&mut logger),
        );

        assert!(actor_loss.is_finite());
        assert!(critic_loss.is_finite());

        logger.log();
        assert!(logger.has_logged("actor_loss"));
        assert!(logger.has_logged("critic_loss"));
    }

    #[test]
    fn test_normalization_snapshot_refresh() {
        let mut agent = seeded_agent(small_config().with_norm_obs(true));

        // Before refresh the snapshot is identity-like (zero mean, unit var).
        let raw = agent.normalize_obs(&[0.5, 0.5, 0.5]);
        assert_eq!(raw, vec![0.5, 0.5, 0.5]);

        agent.update_normalization_stats();
        let mean = agent.replay().moving_mean();
        let normalized = agent.normalize_obs(&mean);
        for v in normalized {
            assert!(v.abs() < 1e-5);
        }
    }
}
