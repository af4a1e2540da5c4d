//! Running statistics using Welford's online algorithm.
//!
//! The replay buffer accumulates per-dimension observation statistics as
//! transitions arrive; the agent pulls an explicit snapshot of them into an
//! [`ObsNormalizer`] before each learning step. The snapshot is never a live
//! view, so normalization is stable within a gradient step.

use serde::{Deserialize, Serialize};

/// Running mean and variance using Welford's online algorithm.
///
/// Maintains per-dimension statistics, numerically stable for large sample
/// counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunningMeanStd {
    /// Running mean per dimension.
    mean: Vec<f64>,
    /// Sum of squared deviations per dimension (variance = var_sum / count).
    var_sum: Vec<f64>,
    /// Number of samples seen.
    count: f64,
}

impl RunningMeanStd {
    /// Create statistics for the given dimensionality.
    pub fn new(dim: usize) -> Self {
        Self {
            mean: vec![0.0; dim],
            var_sum: vec![0.0; dim],
            count: 0.0,
        }
    }

    /// Update with a single observation.
    ///
    /// # Panics
    /// Panics if the observation dimensionality does not match.
    pub fn update(&mut self, obs: &[f32]) {
        assert_eq!(obs.len(), self.mean.len(), "observation dimension mismatch");

        self.count += 1.0;
        for i in 0..obs.len() {
            let x = obs[i] as f64;
            let delta = x - self.mean[i];
            self.mean[i] += delta / self.count;
            let delta2 = x - self.mean[i];
            self.var_sum[i] += delta * delta2;
        }
    }

    /// Update with a flattened batch of observations.
    pub fn update_batch(&mut self, batch: &[f32]) {
        let dim = self.mean.len();
        assert_eq!(batch.len() % dim, 0, "batch size must be a multiple of dimension");

        for obs in batch.chunks_exact(dim) {
            self.update(obs);
        }
    }

    /// Running mean vector.
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Population variance vector. Ones until at least two samples arrive.
    pub fn variance(&self) -> Vec<f64> {
        if self.count < 2.0 {
            vec![1.0; self.mean.len()]
        } else {
            self.var_sum.iter().map(|&v| v / self.count).collect()
        }
    }

    /// Number of samples seen.
    pub fn count(&self) -> f64 {
        self.count
    }

    /// Dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    /// Reset to the initial state.
    pub fn reset(&mut self) {
        self.mean.fill(0.0);
        self.var_sum.fill(0.0);
        self.count = 0.0;
    }
}

/// Variance floor applied when standardizing.
const VAR_EPS: f64 = 1e-8;

/// Agent-side snapshot of observation statistics.
///
/// Holds the mean/variance vectors used to standardize observations before
/// they enter either network. [`ObsNormalizer::refresh`] copies the buffer's
/// current statistics in; between refreshes the snapshot is fixed. When
/// disabled the normalizer is the identity.
#[derive(Debug, Clone)]
pub struct ObsNormalizer {
    mean: Vec<f64>,
    var: Vec<f64>,
    enabled: bool,
}

impl ObsNormalizer {
    /// Create a normalizer with zero mean and unit variance.
    pub fn new(dim: usize, enabled: bool) -> Self {
        Self {
            mean: vec![0.0; dim],
            var: vec![1.0; dim],
            enabled,
        }
    }

    /// Pull a snapshot of the given running statistics.
    pub fn refresh(&mut self, stats: &RunningMeanStd) {
        assert_eq!(stats.dim(), self.mean.len(), "statistics dimension mismatch");
        self.mean.copy_from_slice(stats.mean());
        self.var = stats.variance();
    }

    /// Standardize a single observation: `(x - mean) / sqrt(var)`.
    pub fn normalize(&self, obs: &[f32]) -> Vec<f32> {
        if !self.enabled {
            return obs.to_vec();
        }
        assert_eq!(obs.len(), self.mean.len(), "observation dimension mismatch");

        obs.iter()
            .enumerate()
            .map(|(i, &x)| {
                let std = self.var[i].max(VAR_EPS).sqrt();
                ((x as f64 - self.mean[i]) / std) as f32
            })
            .collect()
    }

    /// Standardize a flattened batch of observations.
    pub fn normalize_batch(&self, batch: &[f32]) -> Vec<f32> {
        if !self.enabled {
            return batch.to_vec();
        }
        let dim = self.mean.len();
        assert_eq!(batch.len() % dim, 0, "batch size must be a multiple of dimension");

        let mut out = Vec::with_capacity(batch.len());
        for obs in batch.chunks_exact(dim) {
            out.extend(self.normalize(obs));
        }
        out
    }

    /// Whether normalization is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Dimensionality.
    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}
