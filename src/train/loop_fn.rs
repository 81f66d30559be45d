use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::seq::SliceRandom;
use tracing::{info, warn};

use crate::backend::differentiable::Differentiable;
use crate::context::ExecutionContext;
use crate::error::{MdnError, Result};
use crate::math::matrix::Matrix;
use crate::optim::optimizer::Optimizer;
use crate::train::epoch_stats::{EpochStats, TrainHistory};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `model` for `config.epochs` epochs, minimizing its loss on the
/// training set, and returns every epoch's statistics.
///
/// # Arguments
/// - `model`          — modified in place by `optimizer`
/// - `train_inputs`   — N×D training inputs
/// - `train_targets`  — N×1 training targets, row-aligned with the inputs
/// - `test_inputs`    — optional held-out inputs
/// - `test_targets`   — held-out targets (required iff `test_inputs` is `Some`)
/// - `optimizer`      — applies each update
/// - `config`         — epochs, batching, optional progress channel and stop flag
/// - `ctx`            — shuffles mini-batches
///
/// The train loss of an epoch is the loss computed in the forward pass of
/// its updates; the test loss is evaluated afterwards without updates.
/// Before the first epoch both losses are evaluated once and recorded as
/// `TrainHistory::initial`.
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
#[tracing::instrument(skip_all, fields(epochs = config.epochs, rows = train_inputs.rows))]
#[allow(clippy::too_many_arguments)]
pub fn train_loop<M: Differentiable>(
    model: &mut M,
    train_inputs: &Matrix,
    train_targets: &Matrix,
    test_inputs: Option<&Matrix>,
    test_targets: Option<&Matrix>,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
    ctx: &mut ExecutionContext,
) -> Result<TrainHistory> {
    config.validate()?;
    if train_inputs.rows == 0 {
        return Err(MdnError::EmptyBatch);
    }
    let test = match (test_inputs, test_targets) {
        (Some(x), Some(y)) => Some((x, y)),
        (None, None) => None,
        _ => {
            return Err(MdnError::InvalidConfig(
                "test inputs and test targets must be given together".into(),
            ))
        }
    };

    let initial = EpochStats {
        epoch: 0,
        total_epochs: config.epochs,
        train_loss: model.forward(train_inputs, train_targets)?,
        test_loss: test.map(|(x, y)| model.forward(x, y)).transpose()?,
        learning_rate: optimizer.learning_rate(),
        elapsed_ms: 0,
    };
    let mut history = TrainHistory { initial, epochs: Vec::with_capacity(config.epochs) };

    for epoch in 1..=config.epochs {
        // Check stop flag at the top of each epoch.
        if stop_requested(config) {
            warn!(epoch, "stop flag set; ending training early");
            break;
        }

        let t_start = Instant::now();

        // ── Updates over the training data ───────────────────────────────
        let train_loss = match config.batch_size {
            Some(batch_size) if batch_size < train_inputs.rows => run_minibatch_epoch(
                model,
                train_inputs,
                train_targets,
                optimizer,
                batch_size,
                ctx,
            )?,
            _ => run_full_batch_step(model, train_inputs, train_targets, optimizer)?,
        };

        // ── Held-out evaluation ──────────────────────────────────────────
        let test_loss = test.map(|(x, y)| model.forward(x, y)).transpose()?;

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            test_loss,
            learning_rate: optimizer.learning_rate(),
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        info!(
            epoch,
            train_loss = stats.train_loss,
            test_loss = ?stats.test_loss,
            elapsed_ms = stats.elapsed_ms,
            "epoch complete"
        );
        history.epochs.push(stats.clone());

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                warn!(epoch, "progress receiver dropped; ending training early");
                break;
            }
        }
    }

    Ok(history)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn stop_requested(config: &TrainConfig) -> bool {
    config.stop_flag.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// One gradient step on the whole training set. Returns the pre-update loss.
fn run_full_batch_step<M: Differentiable>(
    model: &mut M,
    inputs: &Matrix,
    targets: &Matrix,
    optimizer: &mut dyn Optimizer,
) -> Result<f64> {
    let (loss, grads) = model.gradient(inputs, targets)?;
    optimizer.step(&mut *model, &grads)?;
    Ok(loss)
}

/// One shuffled pass of mini-batch steps. Returns the row-weighted mean of
/// the per-batch pre-update losses.
fn run_minibatch_epoch<M: Differentiable>(
    model: &mut M,
    inputs: &Matrix,
    targets: &Matrix,
    optimizer: &mut dyn Optimizer,
    batch_size: usize,
    ctx: &mut ExecutionContext,
) -> Result<f64> {
    let n = inputs.rows;
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(ctx.rng());

    let mut total_loss = 0.0;
    for batch in indices.chunks(batch_size) {
        let x = inputs.select_rows(batch);
        let y = targets.select_rows(batch);
        let (loss, grads) = model.gradient(&x, &y)?;
        optimizer.step(&mut *model, &grads)?;
        total_loss += loss * batch.len() as f64;
    }

    Ok(total_loss / n as f64)
}
