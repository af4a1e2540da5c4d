//! Bounded action transform: a scaled hyperbolic tangent bijection.
//!
//! Maps an unconstrained real vector to an action strictly inside
//! per-dimension limits, `y = limit * tanh(x)`, and supplies the
//! log-absolute-determinant-of-Jacobian term needed to compute exact
//! densities under the transform:
//!
//! ```text
//! log |dy/dx| = log(1 - tanh²(x)) + log|limit|
//!             = 2 * (log 2 - x - softplus(-2x)) + log|limit|
//! ```
//!
//! The softplus identity stays finite for large |x| where `1 - tanh²(x)`
//! underflows.

use burn::tensor::activation::softplus;
use burn::tensor::{backend::Backend, Tensor};

/// Clip margin applied before the inverse transform. Values at the exact
/// boundary are truncated inward rather than mapped to infinity.
const BOUNDARY_EPS: f32 = 1e-5;

/// Elementwise `limit * tanh(x)` bijection with per-dimension limits.
#[derive(Debug, Clone)]
pub struct BoundedTanh {
    limits: Vec<f32>,
}

impl BoundedTanh {
    /// Create a transform with the given per-dimension limits.
    ///
    /// # Panics
    /// Panics if `limits` is empty or contains a zero entry.
    pub fn new(limits: Vec<f32>) -> Self {
        assert!(!limits.is_empty(), "action limits must be non-empty");
        assert!(
            limits.iter().all(|&l| l != 0.0),
            "action limits must be non-zero"
        );
        Self { limits }
    }

    /// Number of action dimensions.
    pub fn dim(&self) -> usize {
        self.limits.len()
    }

    /// Per-dimension limits.
    pub fn limits(&self) -> &[f32] {
        &self.limits
    }

    fn limits_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(self.limits.as_slice(), device).reshape([1, self.limits.len()])
    }

    /// `y = limit * tanh(x)`, elementwise over [batch, dim].
    pub fn forward<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let limits = self.limits_tensor::<B>(&x.device());
        x.tanh() * limits
    }

    /// `x = atanh(clip(y / limit, -1 + eps, 1 - eps))`.
    ///
    /// The clip truncates values at the boundary instead of overflowing;
    /// exact recovery is only expected away from saturation.
    pub fn inverse<B: Backend>(&self, y: Tensor<B, 2>) -> Tensor<B, 2> {
        let limits = self.limits_tensor::<B>(&y.device());
        let unit = (y / limits).clamp(-1.0 + BOUNDARY_EPS, 1.0 - BOUNDARY_EPS);
        atanh(unit)
    }

    /// Per-dimension `log |dy/dx|` evaluated at the pre-squash value `x`.
    pub fn log_abs_det_jacobian<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let device = x.device();
        let sp = softplus(x.clone().mul_scalar(-2.0), 1.0);
        let ldj = (x.neg().add_scalar(std::f32::consts::LN_2) - sp).mul_scalar(2.0);

        let log_limits = self.limits_tensor::<B>(&device).abs().log();
        ldj + log_limits
    }
}

/// Inverse hyperbolic tangent: `0.5 * log((1 + x) / (1 - x))`.
///
/// Input must already be inside (-1, 1); a defensive clamp guards the
/// division.
fn atanh<B: Backend>(x: Tensor<B, 2>) -> Tensor<B, 2> {
    let x = x.clamp(-1.0 + BOUNDARY_EPS, 1.0 - BOUNDARY_EPS);
    let one_plus = x.clone().add_scalar(1.0);
    let one_minus = x.neg().add_scalar(1.0);
    (one_plus / one_minus).log().mul_scalar(0.5)
}
