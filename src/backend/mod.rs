//! The seam between a model and the optimizers that train it.

pub mod differentiable;

pub use differentiable::Differentiable;
