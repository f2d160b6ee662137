//! Fits the linear pricing model from the reference population and writes the JSON
//! artifact the server loads at startup.

use anyhow::Context;
use car_quote_engine::config::{DEFAULT_MODEL_ARTIFACT_PATH, DEFAULT_REFERENCE_DATA_PATH};
use car_quote_engine::reference_data::ReferenceDataset;
use car_quote_engine::training::{fit_ridge, RidgeOptions};
use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    name = "fit_model",
    about = "Fit the premium model from the reference dataset",
    after_help = "Example:\n  fit_model --data data/reference_population.csv --alpha 1.0"
)]
struct Args {
    #[arg(long, default_value = DEFAULT_REFERENCE_DATA_PATH, help = "Reference population CSV")]
    data: PathBuf,
    #[arg(long, default_value = DEFAULT_MODEL_ARTIFACT_PATH, help = "Where to write the artifact")]
    output: PathBuf,
    #[arg(long, default_value_t = 1.0, help = "Ridge regularization strength")]
    alpha: f64,
    #[arg(long, help = "Training date recorded in the artifact (YYYY-MM-DD, default today)")]
    training_date: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "car_quote_engine=info,fit_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    if !(args.alpha.is_finite() && args.alpha >= 0.0) {
        anyhow::bail!("--alpha must be a non-negative number");
    }

    let dataset = ReferenceDataset::load(&args.data)
        .with_context(|| format!("loading {}", args.data.display()))?;

    let options = RidgeOptions {
        alpha: args.alpha,
        training_date: args
            .training_date
            .unwrap_or_else(|| chrono::Utc::now().date_naive()),
    };
    let artifact = fit_ridge(&dataset, &options)?;

    tracing::info!(
        "Fitted on {} records: test R² {:.4}, test MAE {:.2}, test RMSE {:.2}",
        artifact.dataset_info.total_samples,
        artifact.metrics.test_r2,
        artifact.metrics.test_mae,
        artifact.metrics.test_rmse
    );
    for entry in artifact.feature_importance.iter().take(5) {
        tracing::info!("  {:<20} {:>6.2}%", entry.feature, entry.importance);
    }

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&artifact)?;
    std::fs::write(&args.output, json + "\n")
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("Model artifact written to {}", args.output.display());
    Ok(())
}
