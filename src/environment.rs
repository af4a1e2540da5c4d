//! Environment and reward-hook contracts consumed by the training loop.

use burn::tensor::{backend::Backend, Tensor};

/// Result of stepping an environment.
///
/// Termination and truncation are reported separately so the learner can
/// bootstrap through time-limit endings.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Observation after the step.
    pub next_obs: Vec<f32>,
    /// Scalar reward.
    pub rwd: f32,
    /// Episode ended in a true terminal state.
    pub terminal: bool,
    /// Episode ended by a time limit.
    pub truncated: bool,
}

impl StepOutcome {
    /// Whether the episode ended for any reason.
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }
}

/// Synchronous single-environment contract.
///
/// No retry semantics: a failing environment should panic, which is fatal
/// to the training run.
pub trait Environment {
    /// Observation vector width.
    fn obs_dim(&self) -> usize;

    /// Action vector width.
    fn act_dim(&self) -> usize;

    /// Reset to an initial state and return the first observation.
    fn reset(&mut self) -> Vec<f32>;

    /// Apply an action and advance one step.
    fn step(&mut self, action: &[f32]) -> StepOutcome;

    /// Release any resources held by the environment.
    fn close(&mut self) {}
}

/// Injected reward override used during critic-target computation.
///
/// Called on the non-autodiff backend (no gradient tracking) with the
/// normalized observation batch and the stored actions; must be a pure
/// function of its inputs. This is the hook for reward-learning setups that
/// replace the environment reward with a learned one.
pub trait RewardFn<B: Backend> {
    /// Compute a reward per batch row, shape [batch].
    fn reward(&self, obs_norm: Tensor<B, 2>, act: Tensor<B, 2>) -> Tensor<B, 1>;
}

impl<B: Backend, F> RewardFn<B> for F
where
    F: Fn(Tensor<B, 2>, Tensor<B, 2>) -> Tensor<B, 1>,
{
    fn reward(&self, obs_norm: Tensor<B, 2>, act: Tensor<B, 2>) -> Tensor<B, 1> {
        self(obs_norm, act)
    }
}
