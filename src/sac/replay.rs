//! Uniform replay buffer with running observation statistics.
//!
//! Ring-buffer storage with overwrite-oldest semantics and uniform random
//! sampling with replacement. Each appended observation also feeds the
//! buffer's running mean/variance, which the agent pulls as a snapshot
//! before each learning step. `push()` marks an episode boundary for
//! episode-level bookkeeping; it does not gate sampling.

use crate::core::running_stats::RunningMeanStd;
use crate::core::transition::Transition;

/// Ring buffer with O(1) insert and random access; overwrites the oldest
/// entry when full.
struct RingBuffer<T> {
    buffer: Vec<T>,
    capacity: usize,
    write_pos: usize,
}

impl<T> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        Self {
            buffer: Vec::with_capacity(capacity.min(4096)),
            capacity,
            write_pos: 0,
        }
    }

    fn push(&mut self, item: T) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(item);
        } else {
            self.buffer[self.write_pos] = item;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
    }

    #[inline]
    fn get(&self, idx: usize) -> &T {
        &self.buffer[idx]
    }

    #[inline]
    fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// A sampled minibatch as flat fixed-width arrays.
///
/// `obs`/`next_obs` have `len * obs_dim` entries, `act` has `len * act_dim`,
/// `rwd` and `done` have `len`. `done` is 1.0 only for true terminal
/// transitions; truncated episode endings bootstrap through their final
/// state and stay 0.0.
#[derive(Debug, Clone)]
pub struct ReplayBatch {
    /// Observations.
    pub obs: Vec<f32>,
    /// Actions.
    pub act: Vec<f32>,
    /// Next observations.
    pub next_obs: Vec<f32>,
    /// Rewards.
    pub rwd: Vec<f32>,
    /// Terminal mask (1.0 terminal, 0.0 otherwise).
    pub done: Vec<f32>,
    len: usize,
}

impl ReplayBatch {
    /// Number of transitions in the batch.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Uniform replay buffer over fixed-width transitions.
pub struct ReplayBuffer {
    obs_dim: usize,
    act_dim: usize,
    storage: RingBuffer<Transition>,
    stats: RunningMeanStd,
    episodes: usize,
    rng: fastrand::Rng,
}

impl ReplayBuffer {
    /// Create a buffer for the given dimensions and capacity.
    pub fn new(obs_dim: usize, act_dim: usize, capacity: usize) -> Self {
        Self {
            obs_dim,
            act_dim,
            storage: RingBuffer::new(capacity),
            stats: RunningMeanStd::new(obs_dim),
            episodes: 0,
            rng: fastrand::Rng::new(),
        }
    }

    /// Reseed the sampling RNG.
    pub fn seed(&mut self, seed: u64) {
        self.rng = fastrand::Rng::with_seed(seed);
    }

    /// Store a transition and fold its observation into the running
    /// statistics.
    ///
    /// # Panics
    /// Panics on dimension mismatch.
    pub fn append(&mut self, transition: Transition) {
        assert_eq!(transition.obs.len(), self.obs_dim, "observation dimension mismatch");
        assert_eq!(transition.next_obs.len(), self.obs_dim, "observation dimension mismatch");
        assert_eq!(transition.act.len(), self.act_dim, "action dimension mismatch");

        self.stats.update(&transition.obs);
        self.storage.push(transition);
    }

    /// Finalize an episode boundary.
    pub fn push(&mut self) {
        self.episodes += 1;
    }

    /// Sample a uniform random minibatch, with replacement.
    ///
    /// Sampling with replacement makes a batch larger than the stored count
    /// well defined: transitions simply repeat.
    ///
    /// # Panics
    /// Panics if the buffer is empty.
    pub fn sample(&mut self, batch_size: usize) -> ReplayBatch {
        assert!(
            !self.storage.is_empty(),
            "cannot sample from an empty replay buffer"
        );

        let mut obs = Vec::with_capacity(batch_size * self.obs_dim);
        let mut act = Vec::with_capacity(batch_size * self.act_dim);
        let mut next_obs = Vec::with_capacity(batch_size * self.obs_dim);
        let mut rwd = Vec::with_capacity(batch_size);
        let mut done = Vec::with_capacity(batch_size);

        let len = self.storage.len();
        for _ in 0..batch_size {
            let t = self.storage.get(self.rng.usize(..len));
            obs.extend_from_slice(&t.obs);
            act.extend_from_slice(&t.act);
            next_obs.extend_from_slice(&t.next_obs);
            rwd.push(t.rwd);
            done.push(if t.terminal { 1.0 } else { 0.0 });
        }

        ReplayBatch {
            obs,
            act,
            next_obs,
            rwd,
            done,
            len: batch_size,
        }
    }

    /// Running mean of stored observations.
    pub fn moving_mean(&self) -> Vec<f32> {
        self.stats.mean().iter().map(|&m| m as f32).collect()
    }

    /// Running variance of stored observations.
    pub fn moving_variance(&self) -> Vec<f32> {
        self.stats.variance().iter().map(|&v| v as f32).collect()
    }

    /// The running statistics value object.
    pub fn statistics(&self) -> &RunningMeanStd {
        &self.stats
    }

    /// Number of stored transitions.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the buffer holds no transitions.
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.storage.capacity
    }

    /// Number of finalized episodes.
    pub fn num_episodes(&self) -> usize {
        self.episodes
    }

    /// Fill fraction, 0.0 to 1.0.
    pub fn utilization(&self) -> f32 {
        self.storage.len() as f32 / self.storage.capacity as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(tag: f32, terminal: bool) -> Transition {
        Transition::new(
            vec![tag, tag + 0.5],
            vec![tag * 0.1],
            vec![tag + 1.0, tag + 1.5],
            tag,
            terminal,
            false,
        )
    }

    #[test]
    fn test_append_and_len() {
        let mut buffer = ReplayBuffer::new(2, 1, 10);
        assert!(buffer.is_empty());

        for i in 0..5 {
            buffer.append(transition(i as f32, i == 4));
        }
        buffer.push();

        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.num_episodes(), 1);
        assert!((buffer.utilization() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut buffer = ReplayBuffer::new(2, 1, 3);
        for i in 0..5 {
            buffer.append(transition(i as f32, false));
        }
        // Capacity 3: only the last three survive.
        assert_eq!(buffer.len(), 3);

        buffer.seed(7);
        let batch = buffer.sample(64);
        for chunk in batch.obs.chunks_exact(2) {
            assert!(chunk[0] >= 2.0, "overwritten transition resurfaced");
        }
    }

    #[test]
    fn test_sample_shapes_and_done_mask() {
        let mut buffer = ReplayBuffer::new(2, 1, 10);
        buffer.append(transition(0.0, false));
        buffer.append(transition(1.0, true));
        buffer.seed(3);

        let batch = buffer.sample(32);
        assert_eq!(batch.len(), 32);
        assert_eq!(batch.obs.len(), 64);
        assert_eq!(batch.act.len(), 32);
        assert_eq!(batch.next_obs.len(), 64);
        assert_eq!(batch.rwd.len(), 32);
        assert_eq!(batch.done.len(), 32);

        // done mirrors the terminal flag of the sampled transition.
        for (r, d) in batch.rwd.iter().zip(batch.done.iter()) {
            let expected = if *r > 0.5 { 1.0 } else { 0.0 };
            assert_eq!(*d, expected);
        }
    }

    #[test]
    fn test_truncated_transitions_keep_zero_done() {
        let mut buffer = ReplayBuffer::new(2, 1, 4);
        let mut t = transition(1.0, false);
        t.truncated = true;
        buffer.append(t);
        buffer.seed(1);

        let batch = buffer.sample(8);
        assert!(batch.done.iter().all(|&d| d == 0.0));
    }

    #[test]
    fn test_oversized_batch_samples_with_replacement() {
        let mut buffer = ReplayBuffer::new(2, 1, 10);
        for i in 0..3 {
            buffer.append(transition(i as f32, false));
        }
        buffer.seed(11);

        // Larger than the stored count: transitions repeat.
        let batch = buffer.sample(50);
        assert_eq!(batch.len(), 50);
        assert_eq!(batch.obs.len(), 100);
    }

    #[test]
    #[should_panic(expected = "empty replay buffer")]
    fn test_sample_empty_panics() {
        let mut buffer = ReplayBuffer::new(2, 1, 10);
        let _ = buffer.sample(4);
    }

    #[test]
    fn test_moving_stats_track_observations() {
        let mut buffer = ReplayBuffer::new(1, 1, 100);
        for &x in &[0.0f32, 2.0, 0.0, 2.0] {
            buffer.append(Transition::new(vec![x], vec![0.0], vec![x], 0.0, false, false));
        }

        let mean = buffer.moving_mean();
        let var = buffer.moving_variance();
        assert!((mean[0] - 1.0).abs() < 1e-6);
        assert!((var[0] - 1.0).abs() < 1e-6);
    }
}
