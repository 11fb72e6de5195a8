//! autood - automated outlier detection from the command line
//!
//! Usage:
//!   autood data.csv --label-col label          # Run with default sweeps
//!   autood data.arff --outlier-range 2 10      # Target 2%..10% outliers
//!   autood data.csv --methods lof,if -o out/   # Choose detectors
//!   autood data.csv --config params.json       # Parameters from JSON

use autood::config::AutoOdParameters;
use autood::detectors::DetectionMethod;
use autood::pipeline::{AutoOd, AutoOdResults};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod error;

use error::{CliError, Result};

/// autood - unsupervised outlier detection by detector ensembles
///
/// Runs LOF, KNN, Isolation Forest and Mahalanobis sweeps, fuses them by
/// co-training, writes the predictions as CSV and prints a JSON summary.
#[derive(Parser, Debug)]
#[command(name = "autood")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input dataset (.csv or .arff)
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Directory for the prediction CSV
    #[arg(short, long, default_value = "results")]
    output_dir: PathBuf,

    /// JSON file with run parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Detection methods (lof, knn, if, mahala)
    #[arg(short, long, value_delimiter = ',')]
    methods: Option<Vec<DetectionMethod>>,

    /// Outlier percentage range, e.g. `5 15`
    #[arg(long, num_args = 2, value_names = ["MIN", "MAX"])]
    outlier_range: Option<Vec<f32>>,

    /// CSV column holding a row index
    #[arg(long)]
    index_col: Option<String>,

    /// CSV column holding 0/1 ground truth
    #[arg(long)]
    label_col: Option<String>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print compact instead of pretty JSON
    #[arg(long)]
    compact: bool,
}

impl Cli {
    /// Parameters from the config file (or defaults) overridden by flags.
    fn parameters(&self) -> Result<AutoOdParameters> {
        let mut params = match &self.config {
            Some(path) => AutoOdParameters::from_json_file(path)?,
            None => AutoOdParameters::default(),
        };
        if let Some(methods) = &self.methods {
            params = params.with_methods(methods.clone());
        }
        if let Some(range) = &self.outlier_range {
            let (min, max) = (range[0], range[1]);
            if !(min > 0.0 && min < max && max < 100.0) {
                return Err(CliError::InvalidConfig(format!(
                    "outlier range [{min}%, {max}%] must satisfy 0 < min < max < 100"
                )));
            }
            info!(min, max, "Outlier range defined in percent");
            params = params.with_outlier_range(min, max);
        }
        if self.index_col.is_some() || self.label_col.is_some() {
            params = params.with_columns(self.index_col.clone(), self.label_col.clone());
        }
        if let Some(seed) = self.seed {
            params = params.with_random_seed(seed);
        }
        params.validate()?;
        Ok(params)
    }
}

fn init_tracing(log_file: Option<&PathBuf>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::File::create(path)?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}

fn run(cli: &Cli) -> Result<AutoOdResults> {
    if !cli.input.is_file() {
        return Err(CliError::FileNotFound(cli.input.clone()));
    }
    let params = cli.parameters()?;
    info!(file = %cli.input.display(), ?params, "Start calling AutoOD");

    let results = AutoOd::new(params).run_from_path(&cli.input, &cli.output_dir)?;
    if results.is_error() {
        return Err(CliError::Load(results.error_message));
    }
    Ok(results)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log_file.as_ref()) {
        eprintln!("error: {e}");
        return e.exit_code();
    }

    let output = run(&cli).and_then(|results| {
        let json = if cli.compact {
            serde_json::to_string(&results)?
        } else {
            serde_json::to_string_pretty(&results)?
        };
        Ok(json)
    });
    match output {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            e.exit_code()
        }
    }
}
