pub mod matrix;
pub mod stats;

pub use matrix::Matrix;
