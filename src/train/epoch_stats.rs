use serde::{Serialize, Deserialize};

use crate::error::Result;

/// Per-epoch training statistics emitted by `train_loop`.
///
/// Losses are mean negative log-likelihood per row, so train and test
/// values are comparable even though the sets differ in size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number; 0 for the evaluation before any update.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    pub train_loss: f64,
    /// Held-out loss after this epoch's updates, if a test set was given.
    pub test_loss: Option<f64>,
    /// Learning rate in effect at the end of the epoch.
    pub learning_rate: f64,
    /// Wall-clock duration of this epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Everything a `train_loop` run measured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainHistory {
    /// Losses before the first update.
    pub initial: EpochStats,
    /// One entry per completed epoch.
    pub epochs: Vec<EpochStats>,
}

impl TrainHistory {
    /// Stats of the last completed epoch, or the initial evaluation if none ran.
    pub fn last(&self) -> &EpochStats {
        self.epochs.last().unwrap_or(&self.initial)
    }

    pub fn completed_epochs(&self) -> usize {
        self.epochs.len()
    }

    /// Writes the history as pretty-printed JSON.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
