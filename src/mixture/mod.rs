//! Gaussian mixture parameters and the likelihood they induce on targets.

pub mod likelihood;
pub mod params;

pub use likelihood::{log_likelihood, nll_gradients, row_log_likelihoods, HeadGradients, LikelihoodMode};
pub use params::MixtureParams;
