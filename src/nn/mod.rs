//! Network modules: orthogonally-initialized linear layers, a configurable
//! MLP, and the twin Q-value critic.
//!
//! The actor is an [`Mlp`] whose output width is `2 * act_dim`; the head is
//! split in half into the Gaussian mean and log standard deviation by the
//! policy sampling code. The critic is a [`TwinQNet`]: two fully
//! independent MLPs over the concatenated state-action input, each with a
//! scalar head. Both heads live in one module so a single optimizer trains
//! both.

mod orthogonal;

pub use orthogonal::{orthogonal_weights, OrthogonalLinear, OrthogonalLinearConfig};

use burn::module::{Ignored, Module};
use burn::prelude::*;
use burn::tensor::activation;

/// Hidden-layer activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Rectified linear unit.
    Relu,
    /// Hyperbolic tangent.
    Tanh,
    /// Sigmoid-weighted linear unit.
    Silu,
}

impl Activation {
    /// Apply the activation elementwise.
    pub fn apply<B: Backend>(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        match self {
            Activation::Relu => activation::relu(x),
            Activation::Tanh => activation::tanh(x),
            Activation::Silu => activation::silu(x),
        }
    }

    /// Orthogonal-initialization gain matched to the activation.
    fn gain(&self) -> f64 {
        match self {
            Activation::Relu | Activation::Silu => std::f64::consts::SQRT_2,
            Activation::Tanh => 5.0 / 3.0,
        }
    }
}

/// Configuration for [`Mlp`].
#[derive(Debug, Clone)]
pub struct MlpConfig {
    /// Input width.
    pub in_dim: usize,
    /// Output width.
    pub out_dim: usize,
    /// Width of each hidden layer.
    pub hidden_dim: usize,
    /// Number of hidden layers.
    pub num_hidden: usize,
    /// Activation between hidden layers.
    pub activation: Activation,
}

impl MlpConfig {
    /// Create a new configuration.
    pub fn new(
        in_dim: usize,
        out_dim: usize,
        hidden_dim: usize,
        num_hidden: usize,
        activation: Activation,
    ) -> Self {
        Self {
            in_dim,
            out_dim,
            hidden_dim,
            num_hidden,
            activation,
        }
    }

    /// Initialize the network.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Mlp<B> {
        let mut layers = Vec::with_capacity(self.num_hidden + 1);
        let gain = self.activation.gain();

        let mut in_dim = self.in_dim;
        for _ in 0..self.num_hidden {
            layers.push(
                OrthogonalLinearConfig::new(in_dim, self.hidden_dim)
                    .with_gain(gain)
                    .init(device),
            );
            in_dim = self.hidden_dim;
        }
        // Linear output head.
        layers.push(OrthogonalLinearConfig::new(in_dim, self.out_dim).init(device));

        Mlp {
            layers,
            activation: Ignored(self.activation),
        }
    }
}

/// Feed-forward network with orthogonally-initialized linear layers.
#[derive(Module, Debug)]
pub struct Mlp<B: Backend> {
    layers: Vec<OrthogonalLinear<B>>,
    activation: Ignored<Activation>,
}

impl<B: Backend> Mlp<B> {
    /// Forward pass for input of shape [batch, in_dim].
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let last = self.layers.len() - 1;
        let mut x = input;
        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = self.activation.0.apply(x);
            }
        }
        x
    }
}

/// Configuration for [`TwinQNet`].
#[derive(Debug, Clone)]
pub struct TwinQConfig {
    /// Observation width.
    pub obs_dim: usize,
    /// Action width.
    pub act_dim: usize,
    /// Width of each hidden layer.
    pub hidden_dim: usize,
    /// Number of hidden layers.
    pub num_hidden: usize,
    /// Activation between hidden layers.
    pub activation: Activation,
}

impl TwinQConfig {
    /// Create a new configuration.
    pub fn new(
        obs_dim: usize,
        act_dim: usize,
        hidden_dim: usize,
        num_hidden: usize,
        activation: Activation,
    ) -> Self {
        Self {
            obs_dim,
            act_dim,
            hidden_dim,
            num_hidden,
            activation,
        }
    }

    /// Initialize the twin critic.
    pub fn init<B: Backend>(&self, device: &B::Device) -> TwinQNet<B> {
        let mlp = |dev: &B::Device| {
            MlpConfig::new(
                self.obs_dim + self.act_dim,
                1,
                self.hidden_dim,
                self.num_hidden,
                self.activation,
            )
            .init(dev)
        };
        TwinQNet {
            q1: mlp(device),
            q2: mlp(device),
        }
    }
}

/// Twin Q-value critic over a shared state-action input.
///
/// The two estimators are trained independently; value targets take the
/// minimum of the pair to counter overestimation bias.
#[derive(Module, Debug)]
pub struct TwinQNet<B: Backend> {
    q1: Mlp<B>,
    q2: Mlp<B>,
}

impl<B: Backend> TwinQNet<B> {
    /// Evaluate both Q heads for a batch of state-action pairs.
    ///
    /// Returns `(q1, q2)`, each of shape [batch, 1].
    pub fn forward(&self, obs: Tensor<B, 2>, act: Tensor<B, 2>) -> (Tensor<B, 2>, Tensor<B, 2>) {
        let input = Tensor::cat(vec![obs, act], 1);
        (self.q1.forward(input.clone()), self.q2.forward(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_mlp_shapes() {
        let device = device();
        let mlp = MlpConfig::new(3, 2, 16, 2, Activation::Relu).init::<B>(&device);

        let input = Tensor::random([5, 3], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(mlp.forward(input).dims(), [5, 2]);
    }

    #[test]
    fn test_mlp_no_hidden_layers() {
        let device = device();
        let mlp = MlpConfig::new(4, 6, 16, 0, Activation::Tanh).init::<B>(&device);

        let input = Tensor::random([2, 4], Distribution::Normal(0.0, 1.0), &device);
        assert_eq!(mlp.forward(input).dims(), [2, 6]);
    }

    #[test]
    fn test_twin_q_shapes_and_independence() {
        let device = device();
        let critic = TwinQConfig::new(3, 1, 16, 2, Activation::Relu).init::<B>(&device);

        let obs = Tensor::random([7, 3], Distribution::Normal(0.0, 1.0), &device);
        let act = Tensor::random([7, 1], Distribution::Normal(0.0, 1.0), &device);

        let (q1, q2) = critic.forward(obs, act);
        assert_eq!(q1.dims(), [7, 1]);
        assert_eq!(q2.dims(), [7, 1]);

        // Independently initialized heads disagree on random input.
        let diff: f32 = (q1 - q2).abs().mean().into_scalar().elem();
        assert!(diff > 1e-6);
    }
}
