use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    math::matrix::Matrix,
    network::spec::LayerSpec,
};

/// Gradients of the loss with respect to one layer's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Matrix,
}

/// Fully-connected layer `a = f(x · W + b)` over a batch of rows.
///
/// The last forward pass is cached (inputs, pre-activations, activations) so
/// that `backward` can run without recomputing it. The cache is not
/// serialized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub input_width: usize,
    pub output_width: usize,
    pub activation: ActivationFunction,
    /// Shape (input_width, output_width).
    pub weights: Matrix,
    /// Shape (1, output_width).
    pub biases: Matrix,
    #[serde(skip)]
    inputs: Matrix,
    #[serde(skip)]
    pre_activations: Matrix,
    #[serde(skip)]
    activations: Matrix,
}

impl Dense {
    /// Builds a layer with He-initialized weights for ReLU and
    /// Xavier-initialized weights otherwise. Biases start at zero.
    pub fn new<R: Rng + ?Sized>(spec: &LayerSpec, rng: &mut R) -> Dense {
        let weights = match spec.activation {
            ActivationFunction::ReLU => Matrix::he(spec.input_width, spec.output_width, rng),
            _ => Matrix::xavier(spec.input_width, spec.output_width, rng),
        };

        Dense {
            input_width: spec.input_width,
            output_width: spec.output_width,
            activation: spec.activation,
            weights,
            biases: Matrix::zeros(1, spec.output_width),
            inputs: Matrix::default(),
            pre_activations: Matrix::default(),
            activations: Matrix::default(),
        }
    }

    pub fn spec(&self) -> LayerSpec {
        LayerSpec {
            input_width: self.input_width,
            output_width: self.output_width,
            activation: self.activation,
        }
    }

    pub fn parameter_count(&self) -> usize {
        self.weights.len() + self.biases.len()
    }

    /// Forward pass over an N×input_width batch; caches state for backprop.
    pub fn forward(&mut self, input: &Matrix) -> Matrix {
        let z = (input * &self.weights).add_row(&self.biases);
        let a = self.activation.apply(&z);
        self.inputs = input.clone();
        self.pre_activations = z;
        self.activations = a.clone();
        a
    }

    /// Forward pass that leaves the cache untouched.
    pub fn evaluate(&self, input: &Matrix) -> Matrix {
        self.activation.apply(&(input * &self.weights).add_row(&self.biases))
    }

    /// Pre-activations `z` of the last `forward` call.
    pub fn pre_activations(&self) -> &Matrix {
        &self.pre_activations
    }

    /// Backward pass from ∂L/∂a (activation space).
    /// Returns the parameter gradients and ∂L/∂x for the previous layer.
    pub fn backward(&self, grad_output: &Matrix) -> (LayerGradients, Matrix) {
        let grad_pre = self.activation.backward(
            grad_output,
            &self.pre_activations,
            &self.activations,
        );
        self.backward_pre_activation(&grad_pre)
    }

    /// Backward pass from ∂L/∂z (pre-activation space). Used when the loss
    /// already folds in the activation's Jacobian, as the mixture heads do.
    pub fn backward_pre_activation(&self, grad_pre: &Matrix) -> (LayerGradients, Matrix) {
        let weights = &self.inputs.transpose() * grad_pre;
        let biases = grad_pre.sum_rows();
        let grad_input = grad_pre * &self.weights.transpose();
        (LayerGradients { weights, biases }, grad_input)
    }

    /// Subtracts the given parameter deltas in place.
    pub fn apply_update(&mut self, weights_delta: &Matrix, biases_delta: &Matrix) {
        self.weights = &self.weights - weights_delta;
        self.biases = &self.biases - biases_delta;
    }
}
