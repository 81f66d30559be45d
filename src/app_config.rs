use std::path::Path;

use serde::{Deserialize, Serialize};

use ferrite_mdn::{LearningRateSchedule, LikelihoodMode, MdnError, MdnSpec, OptimizerKind};

/// Experiment settings as read from a JSON file or the command line.
/// Every field may be omitted; `resolve()` fills in the reference run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub components: Option<usize>,
    pub hidden_widths: Option<Vec<usize>>,
    pub samples: Option<usize>,
    pub test_fraction: Option<f64>,
    pub epochs: Option<usize>,
    pub seed: Option<u64>,
    pub learning_rate: Option<f64>,
    pub decay_rate: Option<f64>,
    pub decay_steps: Option<u64>,
    pub batch_size: Option<usize>,
    pub optimizer: Option<OptimizerKind>,
    pub likelihood: Option<LikelihoodMode>,
}

/// Fully-resolved settings for one training run.
#[derive(Debug, Clone, Serialize)]
pub struct Experiment {
    pub spec: MdnSpec,
    pub samples: usize,
    pub test_fraction: f64,
    pub epochs: usize,
    pub seed: u64,
    pub schedule: LearningRateSchedule,
    pub batch_size: Option<usize>,
    pub optimizer: OptimizerKind,
    pub likelihood: LikelihoodMode,
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<AppConfig, MdnError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    // merge configs where the second overwrites the first
    pub fn merge(self, other: Self) -> Self {
        Self {
            components: other.components.or(self.components),
            hidden_widths: other.hidden_widths.or(self.hidden_widths),
            samples: other.samples.or(self.samples),
            test_fraction: other.test_fraction.or(self.test_fraction),
            epochs: other.epochs.or(self.epochs),
            seed: other.seed.or(self.seed),
            learning_rate: other.learning_rate.or(self.learning_rate),
            decay_rate: other.decay_rate.or(self.decay_rate),
            decay_steps: other.decay_steps.or(self.decay_steps),
            batch_size: other.batch_size.or(self.batch_size),
            optimizer: other.optimizer.or(self.optimizer),
            likelihood: other.likelihood.or(self.likelihood),
        }
    }

    pub fn resolve(self) -> Experiment {
        let mut spec = MdnSpec::new(self.components.unwrap_or(10));
        if let Some(widths) = self.hidden_widths {
            spec.hidden_widths = widths;
        }
        let defaults = LearningRateSchedule::default();
        Experiment {
            spec,
            samples: self.samples.unwrap_or(6000),
            test_fraction: self.test_fraction.unwrap_or(0.25),
            epochs: self.epochs.unwrap_or(20),
            seed: self.seed.unwrap_or(42),
            schedule: LearningRateSchedule {
                initial: self.learning_rate.unwrap_or(defaults.initial),
                decay_rate: self.decay_rate.unwrap_or(defaults.decay_rate),
                decay_steps: self.decay_steps.unwrap_or(defaults.decay_steps),
            },
            batch_size: self.batch_size,
            optimizer: self.optimizer.unwrap_or_default(),
            likelihood: self.likelihood.unwrap_or_default(),
        }
    }
}
