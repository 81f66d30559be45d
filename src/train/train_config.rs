use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use crate::error::{MdnError, Result};
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_loop` run.
///
/// # Fields
/// - `epochs`      — number of passes over the training data
/// - `batch_size`  — `None` for one full-batch step per epoch; `Some(b)` for
///                   shuffled mini-batches of `b` rows
/// - `progress_tx` — optional channel; one `EpochStats` is sent per
///                   completed epoch. If the receiver is dropped the loop
///                   ends early.
/// - `stop_flag`   — optional atomic flag; when set from another thread the
///                   loop ends before the next epoch.
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: Option<usize>,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub stop_flag: Option<Arc<AtomicBool>>,
}

impl TrainConfig {
    /// Full-batch training with no progress channel and no stop flag.
    pub fn new(epochs: usize) -> Self {
        TrainConfig {
            epochs,
            batch_size: None,
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == Some(0) {
            return Err(MdnError::InvalidConfig("batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig::new(20)
    }
}
