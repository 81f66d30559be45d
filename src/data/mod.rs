pub mod split;
pub mod toy;

pub use split::{train_test_split, DataSplit};
pub use toy::build_toy_dataset;
