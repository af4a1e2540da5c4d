//! Online rollout and training loop.
//!
//! The loop interleaves synchronous environment interaction with periodic
//! batched optimization: a uniform-random warm-up seeds the replay buffer,
//! after which actions come from the current policy; every `update_every`
//! steps the normalization snapshot is refreshed and one gradient step
//! runs; every `steps_per_epoch` steps an epoch closes with optional
//! evaluation rollouts, a logger flush, and a user callback.

use burn::optim::Optimizer;
use burn::tensor::backend::AutodiffBackend;

use crate::core::transition::{Rollout, Transition};
use crate::environment::{Environment, RewardFn};
use crate::metrics::StatsLogger;
use crate::nn::{Mlp, TwinQNet};

use super::agent::Sac;
use super::config::TrainOptions;

impl<B: AutodiffBackend> Sac<B> {
    /// Collect one evaluation trajectory with the current policy.
    ///
    /// Resets the environment, repeatedly samples an action with gradients
    /// disabled, and steps until termination, truncation, or `max_steps`.
    /// No learning occurs.
    pub fn rollout<E: Environment>(&self, env: &mut E, max_steps: usize) -> Rollout {
        let mut rollout = Rollout::new();
        let mut obs = env.reset();

        for _ in 0..max_steps {
            let act = self.choose_action(&obs);
            let outcome = env.step(&act);

            rollout.push(Transition::new(
                obs,
                act,
                outcome.next_obs.clone(),
                outcome.rwd,
                outcome.terminal,
                outcome.truncated,
            ));

            obs = outcome.next_obs;
            if outcome.terminal || outcome.truncated {
                break;
            }
        }

        rollout
    }

    /// Run the online training loop and return the logger with the full
    /// statistics history.
    ///
    /// Total length is `opts.total_steps()` environment steps. The optional
    /// `rwd_fn` replaces stored rewards during critic-target computation;
    /// the optional `callback` runs once per epoch after the logger flush,
    /// for checkpointing or external monitoring.
    pub fn train_policy<E, AO, CO>(
        &mut self,
        env: &mut E,
        eval_env: &mut E,
        opts: &TrainOptions,
        actor_optim: &mut AO,
        critic_optim: &mut CO,
        rwd_fn: Option<&dyn RewardFn<B::InnerBackend>>,
        mut callback: Option<&mut dyn FnMut(&Sac<B>, &mut StatsLogger)>,
    ) -> StatsLogger
    where
        E: Environment,
        AO: Optimizer<Mlp<B>, B>,
        CO: Optimizer<TwinQNet<B>, B>,
    {
        let mut logger = StatsLogger::new();
        let total_steps = opts.total_steps();

        let mut obs = env.reset();
        let mut eps_return = 0.0f64;
        let mut eps_len = 0usize;
        let mut epoch = 0usize;

        for t in 0..total_steps {
            // Pure exploration until the buffer is seeded, then the policy.
            let act = if t < opts.update_after {
                self.random_action()
            } else {
                self.choose_action(&obs)
            };

            let outcome = env.step(&act);
            eps_return += outcome.rwd as f64;
            eps_len += 1;

            let done = outcome.terminal || outcome.truncated;
            self.store_transition(Transition::new(
                obs,
                act,
                outcome.next_obs.clone(),
                outcome.rwd,
                outcome.terminal,
                outcome.truncated,
            ));
            obs = outcome.next_obs;

            // The step cap ends the episode for bookkeeping, but the stored
            // transition keeps terminal=false so targets bootstrap through.
            if done || eps_len >= opts.max_steps {
                self.finish_episode();
                logger.push(&[("eps_return", eps_return), ("eps_len", eps_len as f64)]);
                eps_return = 0.0;
                eps_len = 0;
                obs = env.reset();
            }

            if t >= opts.update_after {
                let since = t - opts.update_after + 1;

                if since % opts.update_every == 0 {
                    self.update_normalization_stats();
                    let (actor_loss, critic_loss) = self.take_policy_gradient_step(
                        actor_optim,
                        critic_optim,
                        rwd_fn,
                        Some(&mut logger),
                    );
                    if opts.verbose {
                        println!(
                            "step {t}: actor_loss={actor_loss:.4} critic_loss={critic_loss:.4}"
                        );
                    }
                }

                if since % opts.steps_per_epoch == 0 {
                    epoch += 1;

                    if opts.num_eval_eps > 0 {
                        let mut returns = 0.0f64;
                        let mut lens = 0.0f64;
                        for _ in 0..opts.num_eval_eps {
                            let eval = self.rollout(eval_env, opts.max_steps);
                            returns += eval.eps_return() as f64;
                            lens += eval.len() as f64;
                        }
                        let n = opts.num_eval_eps as f64;
                        logger.push(&[
                            ("eval_eps_return", returns / n),
                            ("eval_eps_len", lens / n),
                        ]);
                    }

                    let elapsed = logger.elapsed();
                    logger.push(&[("epoch", epoch as f64), ("time", elapsed)]);
                    logger.log();

                    if let Some(cb) = callback.as_deref_mut() {
                        cb(self, &mut logger);
                    }
                }
            }
        }

        env.close();
        logger
    }

    /// Uniform random action inside the per-dimension limits.
    fn random_action(&self) -> Vec<f32> {
        self.bound()
            .limits()
            .iter()
            .map(|&limit| limit.abs() * (fastrand::f32() * 2.0 - 1.0))
            .collect()
    }
}
