mod app_config;

use std::error::Error;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use app_config::{AppConfig, Experiment};
use ferrite_mdn::{
    build_toy_dataset, train_loop, train_test_split, ExecutionContext, LikelihoodMode, Matrix,
    MixtureDensityNetwork, OptimizerKind, TrainConfig,
};

#[derive(Parser)]
#[command(name = "ferrite-mdn", version, about = "Mixture density network trained by maximum likelihood")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on the inverse-sine toy dataset and report train/test loss per epoch
    Train(TrainArgs),
    /// Print mixture parameters of a saved model for the given inputs
    Inspect {
        /// Model JSON written by `train --save-model`
        #[arg(long, value_name = "PATH")]
        model: PathBuf,
        /// Comma-separated scalar inputs
        #[arg(
            long,
            value_delimiter = ',',
            allow_negative_numbers = true,
            default_values_t = vec![-10.0, -5.0, 0.0, 5.0, 10.0]
        )]
        inputs: Vec<f64>,
        /// Seed for the per-input sample draw
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[derive(Args)]
struct TrainArgs {
    /// JSON experiment config; flags below override it
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(short = 'k', long)]
    components: Option<usize>,
    #[arg(short = 'n', long)]
    samples: Option<usize>,
    #[arg(short, long)]
    epochs: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    learning_rate: Option<f64>,
    /// Rows per update; omit for one full-batch update per epoch
    #[arg(long)]
    batch_size: Option<usize>,
    #[arg(long, value_enum)]
    optimizer: Option<OptimizerKind>,
    #[arg(long, value_enum)]
    likelihood: Option<LikelihoodMode>,
    /// Write the trained model as JSON
    #[arg(long, value_name = "PATH")]
    save_model: Option<PathBuf>,
    /// Write the per-epoch loss history as JSON
    #[arg(long, value_name = "PATH")]
    history: Option<PathBuf>,
}

impl TrainArgs {
    fn overrides(&self) -> AppConfig {
        AppConfig {
            components: self.components,
            samples: self.samples,
            epochs: self.epochs,
            seed: self.seed,
            learning_rate: self.learning_rate,
            batch_size: self.batch_size,
            optimizer: self.optimizer,
            likelihood: self.likelihood,
            ..AppConfig::default()
        }
    }
}

fn install_logger() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn path_str(path: &std::path::Path) -> Result<&str, Box<dyn Error>> {
    path.to_str().ok_or_else(|| format!("path is not valid UTF-8: {}", path.display()).into())
}

fn run_train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let file_config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    let experiment: Experiment = file_config.merge(args.overrides()).resolve();
    info!(?experiment, "starting experiment");

    let mut ctx = ExecutionContext::seeded(experiment.seed);
    let (x, y) = build_toy_dataset(experiment.samples, &mut ctx);
    let split = train_test_split(&x, &y, experiment.test_fraction, &mut ctx)?;
    println!("Size of features in training data: {:?}", split.x_train.shape());
    println!("Size of output in training data: {:?}", split.y_train.shape());
    println!("Size of features in test data: {:?}", split.x_test.shape());
    println!("Size of output in test data: {:?}", split.y_test.shape());

    let mut model = MixtureDensityNetwork::from_spec(experiment.spec.clone(), &mut ctx)?
        .with_likelihood_mode(experiment.likelihood);
    let mut optimizer = experiment.optimizer.build(experiment.schedule);
    let mut config = TrainConfig::new(experiment.epochs);
    config.batch_size = experiment.batch_size;

    let history = train_loop(
        &mut model,
        &split.x_train,
        &split.y_train,
        Some(&split.x_test),
        Some(&split.y_test),
        optimizer.as_mut(),
        &config,
        &mut ctx,
    )?;

    for stats in std::iter::once(&history.initial).chain(history.epochs.iter()) {
        println!(
            "Epoch {:>3}: Train Loss: {:0.3}, Test Loss: {:0.3}",
            stats.epoch,
            stats.train_loss,
            stats.test_loss.unwrap_or(f64::NAN)
        );
    }

    if let Some(path) = &args.save_model {
        model.save_json(path_str(path)?)?;
        info!(path = %path.display(), "saved model");
    }
    if let Some(path) = &args.history {
        history.save_json(path_str(path)?)?;
        info!(path = %path.display(), "saved loss history");
    }
    Ok(())
}

fn run_inspect(model: PathBuf, inputs: Vec<f64>, seed: u64) -> Result<(), Box<dyn Error>> {
    let model = MixtureDensityNetwork::load_json(path_str(&model)?)?;
    let x = Matrix::column(&inputs);
    let params = model.predict(&x)?;
    let mean = params.expected_value();
    let draws = params.sample(&mut ExecutionContext::seeded(seed))?;

    for (i, input) in inputs.iter().enumerate() {
        println!("x = {input:.3}  E[y] = {:.3}  sample = {:.3}", mean.data[i][0], draws.data[i][0]);
        for k in 0..params.components() {
            println!(
                "    k={k:<2} pi={:.4} mu={:>8.3} sigma={:.3}",
                params.pi.data[i][k], params.mu.data[i][k], params.sigma.data[i][k]
            );
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    install_logger()?;
    let cli = Cli::parse();

    match cli.command {
        Command::Train(args) => run_train(args),
        Command::Inspect { model, inputs, seed } => run_inspect(model, inputs, seed),
    }
}
