use crate::error::Result;
use crate::layers::dense::{Dense, LayerGradients};
use crate::math::matrix::Matrix;

/// A model whose scalar loss on a batch can be evaluated and differentiated
/// with respect to its dense-layer parameters.
///
/// `gradient` returns one `LayerGradients` per layer, in the same order as
/// `layers_mut` yields the layers, so an optimizer can zip the two.
pub trait Differentiable {
    /// Loss on `(inputs, targets)` without touching parameters.
    fn forward(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<f64>;

    /// Loss on `(inputs, targets)` and its gradient.
    fn gradient(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<(f64, Vec<LayerGradients>)>;

    fn layers(&self) -> Vec<&Dense>;

    fn layers_mut(&mut self) -> Vec<&mut Dense>;

    fn parameter_count(&self) -> usize {
        self.layers().iter().map(|layer| layer.parameter_count()).sum()
    }
}
