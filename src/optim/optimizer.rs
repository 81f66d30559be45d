use serde::{Serialize, Deserialize};

use crate::backend::differentiable::Differentiable;
use crate::error::{MdnError, Result};
use crate::layers::dense::{Dense, LayerGradients};
use crate::optim::{adam::Adam, schedule::LearningRateSchedule, sgd::Sgd};

/// Applies one parameter update to a model from its gradients.
pub trait Optimizer {
    /// `grads` must line up with `model.layers_mut()`.
    fn step(&mut self, model: &mut dyn Differentiable, grads: &[LayerGradients]) -> Result<()>;

    /// Learning rate the next `step` will use.
    fn learning_rate(&self) -> f64;
}

/// Optimizer choice as it appears in configs and on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd,
    #[default]
    Adam,
}

impl OptimizerKind {
    pub fn build(self, schedule: LearningRateSchedule) -> Box<dyn Optimizer> {
        match self {
            OptimizerKind::Sgd => Box::new(Sgd::with_schedule(schedule)),
            OptimizerKind::Adam => Box::new(Adam::new(schedule)),
        }
    }
}

/// Checks that there is one gradient per layer and every shape matches.
pub(crate) fn check_gradients(layers: &[&mut Dense], grads: &[LayerGradients]) -> Result<()> {
    if layers.len() != grads.len() {
        return Err(MdnError::shape(
            "optimizer gradients",
            format!("{} layers", layers.len()),
            format!("{} gradients", grads.len()),
        ));
    }
    for (layer, grad) in layers.iter().zip(grads) {
        if layer.weights.shape() != grad.weights.shape() || layer.biases.shape() != grad.biases.shape() {
            return Err(MdnError::shape(
                "optimizer gradients",
                format!("{:?}/{:?}", layer.weights.shape(), layer.biases.shape()),
                format!("{:?}/{:?}", grad.weights.shape(), grad.biases.shape()),
            ));
        }
    }
    Ok(())
}
