//! Transition and trajectory types shared by the agent and the replay buffer.

/// A single environment transition.
///
/// Immutable once stored in the replay buffer. Termination and truncation
/// are tracked separately: either one ends an episode for bookkeeping
/// purposes, but only a true terminal state masks the bootstrap when value
/// targets are computed. A truncated episode is still bootstrapped through
/// its final state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation before the step.
    pub obs: Vec<f32>,
    /// Action taken.
    pub act: Vec<f32>,
    /// Observation after the step.
    pub next_obs: Vec<f32>,
    /// Scalar reward received.
    pub rwd: f32,
    /// Episode ended in a true terminal state (goal reached, failure).
    pub terminal: bool,
    /// Episode ended by a step cap or external time limit.
    pub truncated: bool,
}

impl Transition {
    /// Create a new transition.
    pub fn new(
        obs: Vec<f32>,
        act: Vec<f32>,
        next_obs: Vec<f32>,
        rwd: f32,
        terminal: bool,
        truncated: bool,
    ) -> Self {
        Self {
            obs,
            act,
            next_obs,
            rwd,
            terminal,
            truncated,
        }
    }

    /// Whether the episode ended at this transition for any reason.
    pub fn done(&self) -> bool {
        self.terminal || self.truncated
    }
}

/// A batched evaluation trajectory collected by a policy rollout.
#[derive(Debug, Clone, Default)]
pub struct Rollout {
    /// Transitions in step order.
    pub transitions: Vec<Transition>,
}

impl Rollout {
    /// Create an empty rollout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition.
    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    /// Number of steps in the trajectory.
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    /// Whether the trajectory is empty.
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    /// Undiscounted episode return.
    pub fn eps_return(&self) -> f32 {
        self.transitions.iter().map(|t| t.rwd).sum()
    }
}
