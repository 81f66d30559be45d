pub mod mdn;
pub mod spec;

pub use mdn::MixtureDensityNetwork;
pub use spec::{LayerSpec, MdnSpec};
