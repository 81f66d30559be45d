use serde::{Serialize, Deserialize};

use crate::error::{MdnError, Result};
use crate::math::{matrix::Matrix, stats};
use crate::mixture::params::{shape_str, MixtureParams};

/// How a row's mixture log-density is evaluated.
///
/// Both modes compute ln Σ_k pi_k · N(y; mu_k, sigma_k). `Direct` forms the
/// density sum in linear space and then takes one logarithm, which underflows
/// to ln 0 once every component is far from `y`. `LogSumExp` stays in the log
/// domain and is finite wherever the parameters are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LikelihoodMode {
    Direct,
    #[default]
    LogSumExp,
}

/// Gradients of the mean negative log-likelihood with respect to the three
/// head pre-activations, each N×K.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadGradients {
    /// ∂L/∂(pi logits)
    pub pi: Matrix,
    /// ∂L/∂mu
    pub mu: Matrix,
    /// ∂L/∂(ln sigma)
    pub sigma: Matrix,
}

fn check_targets(params: &MixtureParams, y: &Matrix) -> Result<()> {
    if y.rows != params.rows() || y.cols != 1 {
        return Err(MdnError::shape(
            "mixture targets",
            format!("{}x1", params.rows()),
            shape_str(y),
        ));
    }
    Ok(())
}

/// Per-component log weight + log density for one row.
fn weighted_log_densities(pi: &[f64], mu: &[f64], sigma: &[f64], y: f64) -> Vec<f64> {
    pi.iter().zip(mu.iter()).zip(sigma.iter())
        .map(|((p, m), s)| p.ln() + stats::normal_log_pdf(y, *m, *s))
        .collect()
}

fn row_log_likelihood(pi: &[f64], mu: &[f64], sigma: &[f64], y: f64, mode: LikelihoodMode) -> f64 {
    match mode {
        LikelihoodMode::LogSumExp => stats::log_sum_exp(&weighted_log_densities(pi, mu, sigma, y)),
        LikelihoodMode::Direct => pi.iter().zip(mu.iter()).zip(sigma.iter())
            .map(|((p, m), s)| p * stats::normal_pdf(y, *m, *s))
            .sum::<f64>()
            .ln(),
    }
}

/// Log-likelihood of each target row under its mixture.
///
/// Fails with `NumericalDegeneracy` on the first row whose value is not
/// finite: `-inf` when the density underflows, `+inf` when a vanishing
/// sigma sits exactly on its target, `NaN` otherwise.
pub fn row_log_likelihoods(params: &MixtureParams, y: &Matrix, mode: LikelihoodMode) -> Result<Vec<f64>> {
    check_targets(params, y)?;
    params.pi.iter_rows()
        .zip(params.mu.iter_rows())
        .zip(params.sigma.iter_rows())
        .zip(y.iter_rows())
        .enumerate()
        .map(|(row, (((pi, mu), sigma), target))| {
            let ll = row_log_likelihood(pi, mu, sigma, target[0], mode);
            if ll.is_finite() {
                Ok(ll)
            } else {
                Err(MdnError::degenerate(row, format!("log-likelihood is {ll}")))
            }
        })
        .collect()
}

/// Total log-likelihood Σ_i ln Σ_k pi_ik · N(y_i; mu_ik, sigma_ik).
pub fn log_likelihood(params: &MixtureParams, y: &Matrix, mode: LikelihoodMode) -> Result<f64> {
    Ok(row_log_likelihoods(params, y, mode)?.iter().sum())
}

/// Gradients of L = −(1/N) Σ_i ln Σ_k pi_ik N_ik with respect to the head
/// pre-activations.
///
/// With responsibilities γ_ik = pi_ik N_ik / Σ_j pi_ij N_ij and
/// z_ik = (y_i − mu_ik) / sigma_ik:
///   ∂L/∂logit_ik    = (pi_ik − γ_ik) / N
///   ∂L/∂mu_ik       = −γ_ik · z_ik / sigma_ik / N
///   ∂L/∂ln sigma_ik = γ_ik · (1 − z_ik²) / N
pub fn nll_gradients(params: &MixtureParams, y: &Matrix) -> Result<HeadGradients> {
    check_targets(params, y)?;
    let n = params.rows() as f64;
    let mut d_pi = Vec::with_capacity(params.rows());
    let mut d_mu = Vec::with_capacity(params.rows());
    let mut d_sigma = Vec::with_capacity(params.rows());

    for (row, (((pi, mu), sigma), target)) in params.pi.iter_rows()
        .zip(params.mu.iter_rows())
        .zip(params.sigma.iter_rows())
        .zip(y.iter_rows())
        .enumerate()
    {
        let y = target[0];
        let log_w = weighted_log_densities(pi, mu, sigma, y);
        let lse = stats::log_sum_exp(&log_w);
        if !lse.is_finite() {
            return Err(MdnError::degenerate(row, format!("log-likelihood is {lse}")));
        }
        let gamma: Vec<f64> = log_w.iter().map(|lw| (lw - lse).exp()).collect();

        d_pi.push(pi.iter().zip(gamma.iter()).map(|(p, g)| (p - g) / n).collect());
        // A component with zero responsibility contributes nothing, even
        // where its z-score overflows.
        d_mu.push(
            gamma.iter().zip(mu.iter()).zip(sigma.iter())
                .map(|((&g, m), s)| if g == 0.0 { 0.0 } else { -g * ((y - m) / s) / s / n })
                .collect(),
        );
        d_sigma.push(
            gamma.iter().zip(mu.iter()).zip(sigma.iter())
                .map(|((&g, m), s)| {
                    if g == 0.0 {
                        return 0.0;
                    }
                    let z = (y - m) / s;
                    g * (1.0 - z * z) / n
                })
                .collect(),
        );
    }

    Ok(HeadGradients {
        pi: Matrix::from_data(d_pi),
        mu: Matrix::from_data(d_mu),
        sigma: Matrix::from_data(d_sigma),
    })
}
