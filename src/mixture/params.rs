use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Serialize, Deserialize};

use crate::context::ExecutionContext;
use crate::error::{MdnError, Result};
use crate::math::matrix::Matrix;

/// Largest tolerated deviation of a weight row's sum from 1.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-5;

/// Per-row parameters of a K-component Gaussian mixture, each N×K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixtureParams {
    /// Mixture weights; rows are probability vectors.
    pub pi: Matrix,
    /// Component means.
    pub mu: Matrix,
    /// Component standard deviations, strictly positive.
    pub sigma: Matrix,
}

impl MixtureParams {
    /// Wraps three N×K matrices after checking shapes and invariants.
    pub fn new(pi: Matrix, mu: Matrix, sigma: Matrix) -> Result<MixtureParams> {
        if mu.shape() != pi.shape() {
            return Err(MdnError::shape("mixture mu", shape_str(&pi), shape_str(&mu)));
        }
        if sigma.shape() != pi.shape() {
            return Err(MdnError::shape("mixture sigma", shape_str(&pi), shape_str(&sigma)));
        }
        if pi.cols == 0 {
            return Err(MdnError::InvalidComponentCount(0));
        }
        let params = MixtureParams { pi, mu, sigma };
        params.validate()?;
        Ok(params)
    }

    pub fn rows(&self) -> usize {
        self.pi.rows
    }

    pub fn components(&self) -> usize {
        self.pi.cols
    }

    /// Checks that every weight row sums to 1, every weight is non-negative,
    /// every sigma is positive and finite, and every mean is finite.
    pub fn validate(&self) -> Result<()> {
        for (row, ((pi, mu), sigma)) in self.pi.iter_rows()
            .zip(self.mu.iter_rows())
            .zip(self.sigma.iter_rows())
            .enumerate()
        {
            if let Some(s) = sigma.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
                return Err(MdnError::degenerate(row, format!("sigma collapsed to {s}")));
            }
            if let Some(m) = mu.iter().find(|m| !m.is_finite()) {
                return Err(MdnError::degenerate(row, format!("non-finite mean {m}")));
            }
            if pi.iter().any(|p| p.is_nan() || *p < 0.0) {
                return Err(MdnError::degenerate(row, "negative or NaN mixture weight"));
            }
            let total: f64 = pi.iter().sum();
            if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
                return Err(MdnError::degenerate(row, format!("mixture weights sum to {total}")));
            }
        }
        Ok(())
    }

    /// Reorders components consistently across pi, mu and sigma.
    pub fn permute_components(&self, order: &[usize]) -> MixtureParams {
        MixtureParams {
            pi: self.pi.permute_columns(order),
            mu: self.mu.permute_columns(order),
            sigma: self.sigma.permute_columns(order),
        }
    }

    /// Mean of each row's mixture, Σ_k pi_k · mu_k, as an N×1 column.
    pub fn expected_value(&self) -> Matrix {
        let means: Vec<f64> = self.pi.iter_rows()
            .zip(self.mu.iter_rows())
            .map(|(pi, mu)| pi.iter().zip(mu.iter()).map(|(p, m)| p * m).sum())
            .collect();
        Matrix::column(&means)
    }

    /// Draws one target per row: a component from pi, then a value from
    /// that component's Normal.
    pub fn sample(&self, ctx: &mut ExecutionContext) -> Result<Matrix> {
        let mut draws = Vec::with_capacity(self.rows());
        for (row, ((pi, mu), sigma)) in self.pi.iter_rows()
            .zip(self.mu.iter_rows())
            .zip(self.sigma.iter_rows())
            .enumerate()
        {
            let draw = sample_row(pi, mu, sigma, ctx.rng())
                .map_err(|reason| MdnError::degenerate(row, reason))?;
            draws.push(draw);
        }
        Ok(Matrix::column(&draws))
    }
}

fn sample_row<R: Rng + ?Sized>(
    pi: &[f64],
    mu: &[f64],
    sigma: &[f64],
    rng: &mut R,
) -> std::result::Result<f64, String> {
    let component = WeightedIndex::new(pi)
        .map_err(|e| format!("invalid mixture weights: {e}"))?
        .sample(rng);
    let normal = Normal::new(mu[component], sigma[component])
        .map_err(|e| format!("invalid component {component}: {e}"))?;
    Ok(normal.sample(rng))
}

pub(crate) fn shape_str(m: &Matrix) -> String {
    format!("{}x{}", m.rows, m.cols)
}
