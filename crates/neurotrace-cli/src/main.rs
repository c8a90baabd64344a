mod display;
mod pipeline;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use neurotrace_ai::{DEFAULT_HIGH_CONFIDENCE_THRESHOLD, EnsemblePolicy};
use neurotrace_core::ClassLabels;

use pipeline::{ModelSources, Outcome};

#[derive(Parser)]
#[command(name = "neurotrace", version, about = "Ensemble dementia-risk predictions")]
struct Cli {
    /// Both models must be strictly more confident than this to be averaged.
    #[arg(
        long,
        global = true,
        env = "NEUROTRACE_THRESHOLD",
        default_value_t = DEFAULT_HIGH_CONFIDENCE_THRESHOLD,
        value_parser = parse_threshold
    )]
    threshold: f64,

    /// Class names in index order, comma-separated.
    #[arg(long, global = true, env = "NEUROTRACE_LABELS")]
    labels: Option<ClassLabels>,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = Format::Json)]
    format: Format,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Card,
}

#[derive(Subcommand)]
enum Command {
    /// Combine stored single-model results.
    Combine {
        /// Image (handwriting) model result as JSON.
        #[arg(long)]
        image: Option<PathBuf>,
        /// Tabular (clinical) model result as JSON.
        #[arg(long)]
        tabular: Option<PathBuf>,
    },
    /// Run the configured models and combine their results.
    Predict {
        /// Handwriting image file.
        #[arg(long)]
        image: Option<PathBuf>,
        /// Clinical features as a JSON object.
        #[arg(long)]
        features: Option<PathBuf>,
        /// Base URL of the image model service.
        #[arg(long, env = "NEUROTRACE_IMAGE_URL")]
        image_url: Option<String>,
        /// Base URL of the tabular model service.
        #[arg(long, env = "NEUROTRACE_TABULAR_URL")]
        tabular_url: Option<String>,
        /// Directory holding a local tabular model (`model.onnx`, `features.json`).
        #[arg(long, env = "NEUROTRACE_TABULAR_MODEL")]
        tabular_model: Option<PathBuf>,
        /// Per-request timeout for model services, in seconds.
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,
    },
    /// Show the class labels in use.
    Labels,
}

fn parse_threshold(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(format!("threshold must be within [0, 1], got {s}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("neurotrace v{}", env!("CARGO_PKG_VERSION"));

    let labels = cli.labels.clone().unwrap_or_default();
    let policy = EnsemblePolicy::new(cli.threshold);

    let outcome = match cli.command {
        Command::Labels => {
            println!("{labels}");
            return Ok(());
        }
        Command::Combine { image, tabular } => {
            pipeline::run_combine(&policy, image.as_deref(), tabular.as_deref())?
        }
        Command::Predict {
            image,
            features,
            image_url,
            tabular_url,
            tabular_model,
            timeout_secs,
        } => {
            let sources = ModelSources {
                image_url,
                tabular_url,
                tabular_model,
                timeout: Duration::from_secs(timeout_secs),
            };
            let predictor = pipeline::build_predictor(policy, &sources)?;
            pipeline::run_predict(&predictor, image.as_deref(), features.as_deref()).await?
        }
    };

    match outcome {
        Outcome::Success(resp) => {
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&resp)?),
                Format::Card => display::print_prediction_card(&resp, &labels),
            }
            Ok(())
        }
        Outcome::Failure(resp) => {
            match cli.format {
                Format::Json => println!("{}", serde_json::to_string_pretty(&resp)?),
                Format::Card => display::print_error_card(&resp, &labels),
            }
            anyhow::bail!("{}: {}", resp.error, resp.message)
        }
    }
}
