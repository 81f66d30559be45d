pub mod math;
pub mod activation;
pub mod layers;
pub mod mixture;
pub mod network;
pub mod backend;
pub mod optim;
pub mod train;
pub mod data;
pub mod context;
pub mod error;

// Convenience re-exports
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::{Dense, LayerGradients};
pub use mixture::{LikelihoodMode, MixtureParams};
pub use network::{MdnSpec, MixtureDensityNetwork};
pub use backend::Differentiable;
pub use optim::{Adam, LearningRateSchedule, Optimizer, OptimizerKind, Sgd};
pub use train::{train_loop, EpochStats, TrainConfig, TrainHistory};
pub use data::{build_toy_dataset, train_test_split, DataSplit};
pub use context::ExecutionContext;
pub use error::{MdnError, Result};
