use serde::{Serialize, Deserialize};

use crate::math::{matrix::Matrix, stats};

/// Pointwise (or, for `Softmax`, row-wise) nonlinearity applied after a
/// dense layer's affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    Identity,
    ReLU,
    /// `exp(z)`. Maps onto (0, ∞); used for the standard-deviation head.
    Exponential,
    /// Normalized exponential over each row. Vector-valued, so it is applied
    /// through `apply()` rather than `function()`.
    Softmax,
}

impl ActivationFunction {
    /// Element-wise activation. Not defined for `Softmax`.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => x,
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Exponential => x.exp(),
            ActivationFunction::Softmax => {
                panic!("ActivationFunction::Softmax is row-wise; use ActivationFunction::apply()")
            }
        }
    }

    /// Element-wise derivative at pre-activation `x`. Not defined for `Softmax`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Identity => 1.0,
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Exponential => x.exp(),
            ActivationFunction::Softmax => {
                panic!("ActivationFunction::Softmax is row-wise; use ActivationFunction::backward()")
            }
        }
    }

    /// Activates a whole batch of pre-activations `z` (N×width).
    pub fn apply(&self, z: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => z.map_rows(stats::softmax),
            elementwise => z.map(|x| elementwise.function(x)),
        }
    }

    /// Maps ∂L/∂a to ∂L/∂z, given the pre-activations `z` and the
    /// activations `a` from the same forward pass.
    ///
    /// For `Softmax` this is the Jacobian-vector product
    /// `a ⊙ (g − ⟨g, a⟩)` per row.
    pub fn backward(&self, grad_output: &Matrix, z: &Matrix, a: &Matrix) -> Matrix {
        match self {
            ActivationFunction::Softmax => {
                let data = grad_output.iter_rows().zip(a.iter_rows())
                    .map(|(g, p)| {
                        let dot: f64 = g.iter().zip(p.iter()).map(|(gi, pi)| gi * pi).sum();
                        g.iter().zip(p.iter()).map(|(gi, pi)| pi * (gi - dot)).collect()
                    })
                    .collect();
                Matrix::from_data(data)
            }
            // exp'(z) = exp(z) = a; reuse the stored activation.
            ActivationFunction::Exponential => grad_output.hadamard(a),
            elementwise => grad_output.hadamard(&z.map(|x| elementwise.derivative(x))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn exponential_is_strictly_positive() {
        let z = Matrix::from_data(vec![vec![-30.0, 0.0, 5.0]]);
        let a = ActivationFunction::Exponential.apply(&z);
        assert!(a.data[0].iter().all(|&s| s > 0.0));
        assert_relative_eq!(a.data[0][1], 1.0);
    }

    #[test]
    fn relu_backward_masks_negative_inputs() {
        let z = Matrix::from_data(vec![vec![-1.0, 2.0]]);
        let a = ActivationFunction::ReLU.apply(&z);
        let g = Matrix::from_data(vec![vec![3.0, 4.0]]);
        assert_eq!(ActivationFunction::ReLU.backward(&g, &z, &a).data, vec![vec![0.0, 4.0]]);
    }

    #[test]
    fn softmax_backward_matches_finite_difference() {
        let z = Matrix::from_data(vec![vec![0.3, -1.2, 2.0]]);
        let weights = [0.5, -2.0, 1.5];
        // L = Σ w_i softmax(z)_i
        let loss = |z: &Matrix| -> f64 {
            ActivationFunction::Softmax.apply(z).data[0].iter()
                .zip(weights.iter()).map(|(p, w)| p * w).sum()
        };
        let a = ActivationFunction::Softmax.apply(&z);
        let g = Matrix::from_data(vec![weights.to_vec()]);
        let analytic = ActivationFunction::Softmax.backward(&g, &z, &a);

        let h = 1e-6;
        for j in 0..3 {
            let mut plus = z.clone();
            plus.data[0][j] += h;
            let mut minus = z.clone();
            minus.data[0][j] -= h;
            let numeric = (loss(&plus) - loss(&minus)) / (2.0 * h);
            assert_relative_eq!(analytic.data[0][j], numeric, epsilon = 1e-7);
        }
    }
}
