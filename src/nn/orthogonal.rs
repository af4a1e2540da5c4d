//! Linear layer with orthogonal weight initialization.
//!
//! Orthogonal weight matrices have unit singular values, so forward passes
//! preserve norms and gradients neither explode nor vanish in the early
//! phase of training. Burn has no built-in QR decomposition, so the weights
//! are orthogonalized with Gram-Schmidt.
//!
//! Gain values: 1.0 for linear heads, sqrt(2) ≈ 1.41 for ReLU, 5/3 ≈ 1.67
//! for tanh.

use burn::module::{Module, Param};
use burn::prelude::*;
use burn::tensor::Distribution;

/// Configuration for [`OrthogonalLinear`].
#[derive(Debug, Clone)]
pub struct OrthogonalLinearConfig {
    /// Number of input features.
    pub d_input: usize,
    /// Number of output features.
    pub d_output: usize,
    /// Gain factor scaling the orthogonal weights.
    pub gain: f64,
    /// Whether to include a bias term.
    pub bias: bool,
}

impl OrthogonalLinearConfig {
    /// Create a new configuration with gain 1.0 and a bias term.
    pub fn new(d_input: usize, d_output: usize) -> Self {
        Self {
            d_input,
            d_output,
            gain: 1.0,
            bias: true,
        }
    }

    /// Set the gain factor.
    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = gain;
        self
    }

    /// Set whether to include bias.
    pub fn with_bias(mut self, bias: bool) -> Self {
        self.bias = bias;
        self
    }

    /// Initialize the layer.
    pub fn init<B: Backend>(&self, device: &B::Device) -> OrthogonalLinear<B> {
        let weight =
            orthogonal_weights::<B>(self.d_output, self.d_input, self.gain, device);

        let bias = self
            .bias
            .then(|| Param::from_tensor(Tensor::zeros([self.d_output], device)));

        OrthogonalLinear {
            weight: Param::from_tensor(weight),
            bias,
        }
    }
}

/// Linear layer with orthogonal initialization.
///
/// Functionally equivalent to a plain linear layer; only the initial
/// weights differ.
#[derive(Module, Debug)]
pub struct OrthogonalLinear<B: Backend> {
    /// Weight matrix of shape [d_output, d_input].
    pub weight: Param<Tensor<B, 2>>,
    /// Optional bias of shape [d_output].
    pub bias: Option<Param<Tensor<B, 1>>>,
}

impl<B: Backend> OrthogonalLinear<B> {
    /// Forward pass: `y = x W^T + b` for input of shape [batch, d_input].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let output = input.matmul(self.weight.val().transpose());
        match &self.bias {
            Some(bias) => output + bias.val().unsqueeze_dim(0),
            None => output,
        }
    }
}

/// Generate an orthogonal weight matrix of shape [rows, cols], scaled by
/// `gain`.
pub fn orthogonal_weights<B: Backend>(
    rows: usize,
    cols: usize,
    gain: f64,
    device: &B::Device,
) -> Tensor<B, 2> {
    let random = Tensor::<B, 2>::random([rows, cols], Distribution::Normal(0.0, 1.0), device);

    // Orthogonalize the shorter side: columns for tall matrices, rows
    // (via a transpose round-trip) for wide ones.
    let orthogonal = if rows >= cols {
        gram_schmidt_columns::<B>(random, device)
    } else {
        gram_schmidt_columns::<B>(random.transpose(), device).transpose()
    };

    orthogonal * (gain as f32)
}

/// Gram-Schmidt orthogonalization of the columns of a matrix.
fn gram_schmidt_columns<B: Backend>(matrix: Tensor<B, 2>, device: &B::Device) -> Tensor<B, 2> {
    let [rows, cols] = matrix.dims();

    let mut columns: Vec<Tensor<B, 1>> = (0..cols)
        .map(|i| matrix.clone().slice([0..rows, i..i + 1]).reshape([rows]))
        .collect();

    for i in 0..cols {
        let mut vi = columns[i].clone();

        for j in 0..i {
            let vj = &columns[j];
            let dot_ij = dot::<B>(&vi, vj);
            let dot_jj = dot::<B>(vj, vj);
            let scale = dot_ij / (dot_jj + 1e-10);
            vi = vi - vj.clone() * scale;
        }

        let norm: f32 = vi
            .clone()
            .powf_scalar(2.0)
            .sum()
            .sqrt()
            .into_scalar()
            .elem();

        if norm > 1e-10 {
            columns[i] = vi / norm;
        } else {
            // Linearly dependent draw; replace with a fresh unit vector.
            let fresh: Tensor<B, 1> = Tensor::random([rows], Distribution::Normal(0.0, 1.0), device);
            let fresh_norm: f32 = fresh
                .clone()
                .powf_scalar(2.0)
                .sum()
                .sqrt()
                .into_scalar()
                .elem();
            columns[i] = fresh / fresh_norm;
        }
    }

    let stacked: Vec<Tensor<B, 2>> = columns.into_iter().map(|c| c.unsqueeze_dim(1)).collect();
    Tensor::cat(stacked, 1)
}

fn dot<B: Backend>(a: &Tensor<B, 1>, b: &Tensor<B, 1>) -> f32 {
    (a.clone() * b.clone()).sum().into_scalar().elem()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_forward_shape() {
        let device = device();
        let linear: OrthogonalLinear<B> = OrthogonalLinearConfig::new(4, 3).init(&device);

        let input = Tensor::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(linear.forward(input).dims(), [2, 3]);
    }

    #[test]
    fn test_square_weights_are_orthogonal() {
        let device = device();
        let weights = orthogonal_weights::<B>(4, 4, 1.0, &device);

        let product = weights.clone().matmul(weights.transpose());
        let identity = Tensor::<B, 2>::eye(4, &device);
        let diff: f32 = (product - identity).abs().mean().into_scalar().elem();
        assert!(diff < 0.1, "matrix should be approximately orthogonal");
    }

    #[test]
    fn test_wide_weights_have_orthonormal_rows() {
        let device = device();
        let weights = orthogonal_weights::<B>(3, 8, 1.0, &device);
        assert_eq!(weights.dims(), [3, 8]);

        let product = weights.clone().matmul(weights.transpose());
        let identity = Tensor::<B, 2>::eye(3, &device);
        let diff: f32 = (product - identity).abs().mean().into_scalar().elem();
        assert!(diff < 0.1, "rows should be approximately orthonormal");
    }

    #[test]
    fn test_gain_scales_weights() {
        let device = device();
        let g1 = orthogonal_weights::<B>(4, 4, 1.0, &device);
        let g2 = orthogonal_weights::<B>(4, 4, 2.0, &device);

        let mean_g1: f32 = g1.abs().mean().into_scalar().elem();
        let mean_g2: f32 = g2.abs().mean().into_scalar().elem();
        assert!(mean_g2 > mean_g1 * 1.5);
    }

    #[test]
    fn test_no_bias() {
        let device = device();
        let linear: OrthogonalLinear<B> =
            OrthogonalLinearConfig::new(4, 3).with_bias(false).init(&device);
        assert!(linear.bias.is_none());
    }
}
