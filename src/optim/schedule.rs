use serde::{Serialize, Deserialize};

/// Staircase exponential decay:
/// `lr(t) = initial · decay_rate^floor(t / decay_steps)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LearningRateSchedule {
    pub initial: f64,
    #[serde(default = "default_decay_rate")]
    pub decay_rate: f64,
    #[serde(default = "default_decay_steps")]
    pub decay_steps: u64,
}

fn default_decay_rate() -> f64 {
    0.9
}

fn default_decay_steps() -> u64 {
    100
}

impl LearningRateSchedule {
    /// Decays by 0.9 every 100 steps.
    pub fn new(initial: f64) -> LearningRateSchedule {
        LearningRateSchedule {
            initial,
            decay_rate: default_decay_rate(),
            decay_steps: default_decay_steps(),
        }
    }

    pub fn constant(initial: f64) -> LearningRateSchedule {
        LearningRateSchedule { initial, decay_rate: 1.0, decay_steps: 1 }
    }

    /// Learning rate after `step` completed updates.
    pub fn rate(&self, step: u64) -> f64 {
        let stairs = step / self.decay_steps.max(1);
        self.initial * self.decay_rate.powf(stairs as f64)
    }
}

impl Default for LearningRateSchedule {
    fn default() -> Self {
        LearningRateSchedule::new(0.01)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn decays_in_stairs() {
        let schedule = LearningRateSchedule::new(0.1);
        assert_relative_eq!(schedule.rate(0), 0.1);
        assert_relative_eq!(schedule.rate(99), 0.1);
        assert_relative_eq!(schedule.rate(100), 0.09);
        assert_relative_eq!(schedule.rate(250), 0.081);
        assert_relative_eq!(LearningRateSchedule::constant(0.3).rate(10_000), 0.3);
    }
}
