//! Polyak-averaged target network updates.
//!
//! Temporal difference learning bootstraps from its own value estimates,
//! which turns the regression target into a moving target. A target network
//! breaks the loop: a structural copy of the critic is kept frozen and
//! blended slowly toward the live weights after every critic update:
//!
//! ```text
//! θ_target = polyak * θ_target + (1 - polyak) * θ_live
//! ```
//!
//! with `polyak` close to one (0.995 by default). The target copy lives on
//! the non-autodiff backend and is only ever mutated by [`polyak_update`],
//! so it can never appear on a gradient-tracked computation path.
//!
//! Parameters are matched by traversal order, which is deterministic for two
//! independently created modules of the same architecture.

use burn::module::{Module, ModuleMapper, ParamId};
use burn::prelude::*;

/// A parameter tensor flattened to 1D together with nothing else; flattening
/// sidesteps const-generic dimension mismatches when collecting tensors of
/// varying rank.
struct FlatParam<B: Backend> {
    tensor: Tensor<B, 1>,
}

/// Collects every float parameter of a module, in traversal order.
struct ParamExtractor<B: Backend> {
    params: Vec<FlatParam<B>>,
}

impl<B: Backend> ParamExtractor<B> {
    fn new() -> Self {
        Self { params: Vec::new() }
    }
}

impl<B: Backend> ModuleMapper<B> for ParamExtractor<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let numel: usize = tensor.dims().iter().product();
        self.params.push(FlatParam {
            tensor: tensor.clone().reshape([numel]),
        });
        tensor
    }
}

/// Blends target parameters toward their live counterparts by index.
struct PolyakMapper<B: Backend> {
    live: Vec<FlatParam<B>>,
    polyak: f32,
    index: usize,
}

impl<B: Backend> ModuleMapper<B> for PolyakMapper<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let shape = tensor.dims();
        let numel: usize = shape.iter().product();

        let idx = self.index;
        self.index += 1;

        match self.live.get(idx) {
            Some(live) => {
                let blended = tensor.reshape([numel]).mul_scalar(self.polyak)
                    + live.tensor.clone().mul_scalar(1.0 - self.polyak);
                blended.reshape(shape)
            }
            // Architectures match by construction; an unmatched parameter
            // would mean the two modules diverged structurally.
            None => tensor,
        }
    }
}

/// Blend every target parameter toward its live counterpart:
/// `θ_target = polyak * θ_target + (1 - polyak) * θ_live`.
///
/// `polyak = 1` leaves the target untouched; `polyak = 0` is a hard copy.
pub fn polyak_update<B, M>(live: &M, target: M, polyak: f32) -> M
where
    B: Backend,
    M: Module<B>,
{
    if (polyak - 1.0).abs() < 1e-6 {
        return target;
    }
    if polyak.abs() < 1e-6 {
        return live.clone();
    }

    let mut extractor = ParamExtractor::new();
    let _ = live.clone().map(&mut extractor);

    let mut mapper = PolyakMapper {
        live: extractor.params,
        polyak,
        index: 0,
    };
    target.map(&mut mapper)
}

/// Flattened copies of every float parameter, in traversal order.
///
/// Used by tests to compare parameter sets across update steps.
pub fn flatten_params<B, M>(module: &M) -> Vec<Vec<f32>>
where
    B: Backend,
    M: Module<B>,
{
    let mut extractor = ParamExtractor::new();
    let _ = module.clone().map(&mut extractor);
    extractor
        .params
        .into_iter()
        .map(|p| p.tensor.into_data().as_slice::<f32>().unwrap().to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::nn::LinearConfig;

    type B = NdArray<f32>;

    fn device() -> <B as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_polyak_one_keeps_target() {
        let device = device();
        let live = LinearConfig::new(4, 4).init::<B>(&device);
        let target = LinearConfig::new(4, 4).init::<B>(&device);

        let before = flatten_params::<B, _>(&target);
        let updated = polyak_update(&live, target, 1.0);
        let after = flatten_params::<B, _>(&updated);

        assert_eq!(before, after);
    }

    #[test]
    fn test_polyak_zero_is_hard_copy() {
        let device = device();
        let live = LinearConfig::new(4, 4).init::<B>(&device);
        let target = LinearConfig::new(4, 4).init::<B>(&device);

        let live_params = flatten_params::<B, _>(&live);
        let updated = polyak_update(&live, target, 0.0);
        let after = flatten_params::<B, _>(&updated);

        assert_eq!(live_params, after);
    }

    #[test]
    fn test_polyak_interpolates_every_parameter() {
        let device = device();
        let live = LinearConfig::new(6, 3).init::<B>(&device);
        let target = LinearConfig::new(6, 3).init::<B>(&device);

        let live_params = flatten_params::<B, _>(&live);
        let target_params = flatten_params::<B, _>(&target);

        let polyak = 0.995;
        let updated = polyak_update(&live, target, polyak);
        let after = flatten_params::<B, _>(&updated);

        for (p, (lp, tp)) in after.iter().zip(live_params.iter().zip(target_params.iter())) {
            for i in 0..p.len() {
                let expected = polyak * tp[i] + (1.0 - polyak) * lp[i];
                assert!(
                    (p[i] - expected).abs() < 1e-6,
                    "expected {expected}, got {} at index {i}",
                    p[i]
                );
            }
        }
    }

    #[test]
    fn test_polyak_updates_bias() {
        let device = device();
        let live = LinearConfig::new(4, 4).with_bias(true).init::<B>(&device);
        let target = LinearConfig::new(4, 4).with_bias(true).init::<B>(&device);

        // Linear has two parameter tensors: weight and bias.
        assert_eq!(flatten_params::<B, _>(&live).len(), 2);

        let target_params = flatten_params::<B, _>(&target);
        let updated = polyak_update(&live, target, 0.5);
        let after = flatten_params::<B, _>(&updated);

        // Both tensors moved.
        for (t, a) in target_params.iter().zip(after.iter()) {
            assert_ne!(t, a);
        }
    }
}
