//! Squashed-Gaussian action sampling with exact log-density.
//!
//! The actor head parameterizes a diagonal Gaussian; samples are drawn with
//! the reparameterization trick and pushed through the bounded tanh
//! transform. The returned log-probability carries the change-of-variables
//! correction, so exponentiating it gives the exact density of the bounded
//! action:
//!
//! ```text
//! log π(a|s) = log N(u; μ, σ) - Σ log |d(limit·tanh)/du|
//! ```
//!
//! where `u` is the pre-squash sample and `a = limit * tanh(u)`. The
//! correction term is what makes the entropy bonus in the actor objective
//! meaningful.

use burn::tensor::{backend::Backend, Distribution, Tensor};

use crate::algorithms::bounded::BoundedTanh;
use crate::nn::Mlp;

/// Lower clamp on the policy log standard deviation: `ln(1e-3)`.
pub const LOG_STD_MIN: f32 = -6.907_755;
/// Upper clamp on the policy log standard deviation: `ln(100)`.
pub const LOG_STD_MAX: f32 = 4.605_17;

/// Split the actor head output (width `2 * act_dim`) into its
/// `(mean, log_std)` halves.
pub fn split_policy_head<B: Backend>(out: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
    let [batch, width] = out.dims();
    debug_assert_eq!(width % 2, 0, "policy head width must be even");
    let half = width / 2;

    let mean = out.clone().slice([0..batch, 0..half]);
    let log_std = out.slice([0..batch, half..width]);
    (mean, log_std)
}

/// Draw a bounded action by reparameterized sampling.
///
/// Returns `(action, log_prob)` where `action` has shape [batch, dim] and
/// lies strictly inside the transform's limits, and `log_prob` has shape
/// [batch] and is the exact log-density of the bounded action.
pub fn sample_bounded<B: Backend>(
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
    bound: &BoundedTanh,
) -> (Tensor<B, 2>, Tensor<B, 1>) {
    let device = mean.device();
    let [batch, dim] = mean.dims();

    let log_std = log_std.clamp(LOG_STD_MIN, LOG_STD_MAX);
    let std = log_std.clone().exp();

    // Pathwise sample: the noise draw is a separate step from the
    // differentiable transform, so gradients flow through mean and std.
    let noise = Tensor::<B, 2>::random([batch, dim], Distribution::Normal(0.0, 1.0), &device);
    let raw = mean + std * noise.clone();

    // log N(raw; μ, σ) per dimension; (raw - μ)/σ is the noise itself.
    let log_2pi = (2.0 * std::f32::consts::PI).ln();
    let log_prob_per_dim =
        noise.powf_scalar(2.0).mul_scalar(-0.5) - log_std - 0.5 * log_2pi;
    let gauss_log_prob: Tensor<B, 1> = log_prob_per_dim.sum_dim(1).flatten(0, 1);

    // Change-of-variables correction, evaluated on the raw sample.
    let ldj: Tensor<B, 1> = bound
        .log_abs_det_jacobian(raw.clone())
        .sum_dim(1)
        .flatten(0, 1);

    let action = bound.forward(raw);
    (action, gauss_log_prob - ldj)
}

/// Exact log-density of a given bounded action under `(mean, log_std)`.
///
/// Inverts the transform (with boundary truncation), evaluates the Gaussian
/// log-pdf at the recovered pre-squash value, and applies the Jacobian
/// correction.
pub fn log_prob_bounded<B: Backend>(
    action: Tensor<B, 2>,
    mean: Tensor<B, 2>,
    log_std: Tensor<B, 2>,
    bound: &BoundedTanh,
) -> Tensor<B, 1> {
    let log_std = log_std.clamp(LOG_STD_MIN, LOG_STD_MAX);
    let std = log_std.clone().exp();

    let raw = bound.inverse(action);
    let normalized = (raw.clone() - mean) / std;

    let log_2pi = (2.0 * std::f32::consts::PI).ln();
    let log_prob_per_dim =
        normalized.powf_scalar(2.0).mul_scalar(-0.5) - log_std - 0.5 * log_2pi;
    let gauss_log_prob: Tensor<B, 1> = log_prob_per_dim.sum_dim(1).flatten(0, 1);

    let ldj: Tensor<B, 1> = bound.log_abs_det_jacobian(raw).sum_dim(1).flatten(0, 1);

    gauss_log_prob - ldj
}

/// Run the actor on a normalized observation batch and sample bounded
/// actions with their log-densities.
pub fn sample_action<B: Backend>(
    actor: &Mlp<B>,
    obs_norm: Tensor<B, 2>,
    bound: &BoundedTanh,
) -> (Tensor<B, 2>, Tensor<B, 1>) {
    let (mean, log_std) = split_policy_head(actor.forward(obs_norm));
    sample_bounded(mean, log_std, bound)
}
