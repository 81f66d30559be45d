use crate::{
    backend::differentiable::Differentiable,
    error::Result,
    layers::dense::LayerGradients,
    math::matrix::Matrix,
    optim::{optimizer::{check_gradients, Optimizer}, schedule::LearningRateSchedule},
};

/// First and second moment estimates for one layer.
struct Moments {
    m_weights: Matrix,
    v_weights: Matrix,
    m_biases: Matrix,
    v_biases: Matrix,
}

/// Adam with bias-corrected moment estimates.
pub struct Adam {
    pub schedule: LearningRateSchedule,
    pub beta1: f64,
    pub beta2: f64,
    pub eps: f64,
    t: u64,
    moments: Vec<Moments>,
}

impl Adam {
    pub fn new(schedule: LearningRateSchedule) -> Adam {
        Adam {
            schedule,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            t: 0,
            moments: Vec::new(),
        }
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.t
    }

    fn ensure_moments(&mut self, grads: &[LayerGradients]) {
        let matches = self.moments.len() == grads.len()
            && self.moments.iter().zip(grads).all(|(m, g)| {
                m.m_weights.shape() == g.weights.shape() && m.m_biases.shape() == g.biases.shape()
            });
        if !matches {
            self.moments = grads.iter()
                .map(|g| Moments {
                    m_weights: Matrix::zeros(g.weights.rows, g.weights.cols),
                    v_weights: Matrix::zeros(g.weights.rows, g.weights.cols),
                    m_biases: Matrix::zeros(g.biases.rows, g.biases.cols),
                    v_biases: Matrix::zeros(g.biases.rows, g.biases.cols),
                })
                .collect();
        }
    }
}

impl Optimizer for Adam {
    fn step(&mut self, model: &mut dyn Differentiable, grads: &[LayerGradients]) -> Result<()> {
        let mut layers = model.layers_mut();
        check_gradients(&layers, grads)?;
        self.ensure_moments(grads);

        let lr = self.learning_rate();
        self.t += 1;
        let t = self.t as f64;
        let (b1, b2, eps) = (self.beta1, self.beta2, self.eps);
        let bias1 = 1.0 - b1.powf(t);
        let bias2 = 1.0 - b2.powf(t);

        let update = |m: &mut Matrix, v: &mut Matrix, g: &Matrix| -> Matrix {
            *m = m.zip_with(g, |m, g| m * b1 + g * (1.0 - b1));
            *v = v.zip_with(g, |v, g| v * b2 + g * g * (1.0 - b2));
            m.zip_with(v, |m, v| lr * (m / bias1) / ((v / bias2).sqrt() + eps))
        };

        for ((layer, grad), moments) in layers.iter_mut().zip(grads).zip(self.moments.iter_mut()) {
            let dw = update(&mut moments.m_weights, &mut moments.v_weights, &grad.weights);
            let db = update(&mut moments.m_biases, &mut moments.v_biases, &grad.biases);
            layer.apply_update(&dw, &db);
        }
        Ok(())
    }

    fn learning_rate(&self) -> f64 {
        self.schedule.rate(self.t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{context::ExecutionContext, network::MixtureDensityNetwork, optim::sgd::Sgd};
    use approx::assert_relative_eq;

    fn model_and_batch() -> (MixtureDensityNetwork, Matrix, Matrix) {
        let mut ctx = ExecutionContext::seeded(21);
        let net = MixtureDensityNetwork::new(2, &mut ctx).unwrap();
        (net, Matrix::column(&[-1.0, 0.0, 1.0, 2.0]), Matrix::column(&[0.5, 0.1, -0.4, 1.0]))
    }

    #[test]
    fn first_adam_step_moves_each_weight_by_about_lr() {
        let (mut net, x, y) = model_and_batch();
        let before = net.layers()[0].weights.clone();
        let (_, grads) = net.gradient(&x, &y).unwrap();
        let mut adam = Adam::new(LearningRateSchedule::constant(0.01));
        adam.step(&mut net, &grads).unwrap();
        assert_eq!(adam.steps(), 1);

        let after = net.layers()[0].weights.clone();
        let moved = before.data[0].iter().zip(after.data[0].iter());
        for ((b, a), g) in moved.zip(grads[0].weights.data[0].iter()) {
            if g.abs() > 1e-3 {
                // m̂ = g and v̂ = g², so the step is lr · sign(g).
                assert_relative_eq!(b - a, 0.01 * g.signum(), epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn small_sgd_step_lowers_the_loss() {
        let (mut net, x, y) = model_and_batch();
        let (loss, grads) = net.gradient(&x, &y).unwrap();
        let mut sgd = Sgd::new(1e-3);
        sgd.step(&mut net, &grads).unwrap();
        assert!(net.forward(&x, &y).unwrap() < loss);
    }

    #[test]
    fn gradient_count_is_checked() {
        let (mut net, x, y) = model_and_batch();
        let (_, mut grads) = net.gradient(&x, &y).unwrap();
        grads.pop();
        assert!(Adam::new(LearningRateSchedule::default()).step(&mut net, &grads).is_err());
    }
}
