use crate::{
    backend::differentiable::Differentiable,
    error::Result,
    layers::dense::LayerGradients,
    optim::{optimizer::{check_gradients, Optimizer}, schedule::LearningRateSchedule},
};

/// Plain gradient descent: `θ ← θ − lr · ∇θ`.
pub struct Sgd {
    pub schedule: LearningRateSchedule,
    steps: u64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd::with_schedule(LearningRateSchedule::constant(learning_rate))
    }

    pub fn with_schedule(schedule: LearningRateSchedule) -> Sgd {
        Sgd { schedule, steps: 0 }
    }
}

impl Optimizer for Sgd {
    fn step(&mut self, model: &mut dyn Differentiable, grads: &[LayerGradients]) -> Result<()> {
        let mut layers = model.layers_mut();
        check_gradients(&layers, grads)?;
        let lr = self.learning_rate();
        for (layer, grad) in layers.iter_mut().zip(grads) {
            layer.apply_update(&grad.weights.scale(lr), &grad.biases.scale(lr));
        }
        self.steps += 1;
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.schedule.rate(self.steps)
    }
}
