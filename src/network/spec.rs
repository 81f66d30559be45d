use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::error::{MdnError, Result};

/// Describes one dense layer: an affine map followed by a nonlinearity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub input_width: usize,
    pub output_width: usize,
    pub activation: ActivationFunction,
}

/// Architecture of a mixture density network.
///
/// The trunk is a stack of ReLU layers of the given widths; the last trunk
/// layer feeds three heads of width `components`:
/// - `mu`    — identity
/// - `sigma` — exponential
/// - `pi`    — softmax
///
/// `MdnSpec` can be saved to / loaded from JSON independently of trained
/// weights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdnSpec {
    /// Number of features per input row.
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,
    /// Widths of the ReLU trunk layers, input side first.
    #[serde(default = "default_hidden_widths")]
    pub hidden_widths: Vec<usize>,
    /// Number of mixture components K.
    pub components: usize,
}

fn default_input_dim() -> usize {
    1
}

fn default_hidden_widths() -> Vec<usize> {
    vec![25, 25]
}

impl MdnSpec {
    /// Scalar input, two hidden layers of 25 units, `components` heads.
    pub fn new(components: usize) -> MdnSpec {
        MdnSpec {
            input_dim: default_input_dim(),
            hidden_widths: default_hidden_widths(),
            components,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.components == 0 {
            return Err(MdnError::InvalidComponentCount(self.components));
        }
        if self.input_dim == 0 {
            return Err(MdnError::InvalidSpec("input_dim must be at least 1".into()));
        }
        if let Some(pos) = self.hidden_widths.iter().position(|&w| w == 0) {
            return Err(MdnError::InvalidSpec(format!("hidden layer {pos} has width 0")));
        }
        Ok(())
    }

    /// Width of the representation the heads read from.
    pub fn trunk_output_width(&self) -> usize {
        self.hidden_widths.last().copied().unwrap_or(self.input_dim)
    }

    /// Layer specs of the ReLU trunk, input side first.
    pub fn trunk_layers(&self) -> Vec<LayerSpec> {
        let mut input_width = self.input_dim;
        self.hidden_widths.iter()
            .map(|&output_width| {
                let spec = LayerSpec {
                    input_width,
                    output_width,
                    activation: ActivationFunction::ReLU,
                };
                input_width = output_width;
                spec
            })
            .collect()
    }

    pub fn head_layer(&self, activation: ActivationFunction) -> LayerSpec {
        LayerSpec {
            input_width: self.trunk_output_width(),
            output_width: self.components,
            activation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trunk_chains_widths() {
        let spec = MdnSpec::new(10);
        let trunk = spec.trunk_layers();
        assert_eq!(trunk.len(), 2);
        assert_eq!((trunk[0].input_width, trunk[0].output_width), (1, 25));
        assert_eq!((trunk[1].input_width, trunk[1].output_width), (25, 25));
        let pi = spec.head_layer(ActivationFunction::Softmax);
        assert_eq!((pi.input_width, pi.output_width), (25, 10));
    }

    #[test]
    fn rejects_zero_components_and_widths() {
        assert!(matches!(MdnSpec::new(0).validate(), Err(MdnError::InvalidComponentCount(0))));
        let mut spec = MdnSpec::new(3);
        spec.hidden_widths = vec![25, 0];
        assert!(matches!(spec.validate(), Err(MdnError::InvalidSpec(_))));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let spec: MdnSpec = serde_json::from_str(r#"{ "components": 4 }"#).unwrap();
        assert_eq!(spec, MdnSpec::new(4));
    }
}
