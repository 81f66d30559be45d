pub mod adam;
pub mod optimizer;
pub mod schedule;
pub mod sgd;

pub use adam::Adam;
pub use optimizer::{Optimizer, OptimizerKind};
pub use schedule::LearningRateSchedule;
pub use sgd::Sgd;
