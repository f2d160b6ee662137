use chrono::Datelike;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_REFERENCE_DATA_PATH: &str = "data/reference_population.csv";
pub const DEFAULT_MODEL_ARTIFACT_PATH: &str = "models/premium_model.json";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub reference_data_path: PathBuf,
    pub model_artifact_path: PathBuf,
    /// Optional JSON override of the pricing constants.
    pub pricing_config_path: Option<PathBuf>,
    /// Year vehicle age is measured from.
    pub reference_year: i32,
    pub comparison_min_population: usize,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            reference_data_path: path_var("REFERENCE_DATA_PATH", DEFAULT_REFERENCE_DATA_PATH)?,
            model_artifact_path: path_var("MODEL_ARTIFACT_PATH", DEFAULT_MODEL_ARTIFACT_PATH)?,
            pricing_config_path: std::env::var("PRICING_CONFIG_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            reference_year: match std::env::var("QUOTE_REFERENCE_YEAR") {
                Ok(raw) => raw
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| anyhow::anyhow!("QUOTE_REFERENCE_YEAR must be a year"))
                    .and_then(|year| {
                        if !(1980..=2200).contains(&year) {
                            anyhow::bail!("QUOTE_REFERENCE_YEAR must be between 1980 and 2200");
                        }
                        Ok(year)
                    })?,
                Err(_) => chrono::Utc::now().year(),
            },
            comparison_min_population: std::env::var("COMPARISON_MIN_POPULATION")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("COMPARISON_MIN_POPULATION must be a number"))
                .and_then(|n: usize| {
                    if n == 0 {
                        anyhow::bail!("COMPARISON_MIN_POPULATION must be at least 1");
                    }
                    Ok(n)
                })?,
            rate_limit_per_second: std::env::var("RATE_LIMIT_PER_SECOND")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_PER_SECOND must be a number"))
                .and_then(|n: u64| {
                    if n == 0 {
                        anyhow::bail!("RATE_LIMIT_PER_SECOND must be at least 1");
                    }
                    Ok(n)
                })?,
            rate_limit_burst: std::env::var("RATE_LIMIT_BURST")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RATE_LIMIT_BURST must be a number"))
                .and_then(|n: u32| {
                    if n == 0 {
                        anyhow::bail!("RATE_LIMIT_BURST must be at least 1");
                    }
                    Ok(n)
                })?,
        };

        tracing::info!("Configuration loaded successfully");
        tracing::debug!("Reference data: {}", config.reference_data_path.display());
        tracing::debug!("Model artifact: {}", config.model_artifact_path.display());
        if let Some(ref path) = config.pricing_config_path {
            tracing::info!("Pricing override configured: {}", path.display());
        }
        tracing::debug!("Reference year: {}", config.reference_year);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}

fn path_var(name: &str, default: &str) -> anyhow::Result<PathBuf> {
    match std::env::var(name) {
        Ok(raw) if raw.trim().is_empty() => anyhow::bail!("{} cannot be empty", name),
        Ok(raw) => Ok(PathBuf::from(raw)),
        Err(_) => Ok(PathBuf::from(default)),
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the environment.
    pub(crate) fn for_tests(reference_year: i32) -> Self {
        Self {
            port: 0,
            reference_data_path: PathBuf::from(DEFAULT_REFERENCE_DATA_PATH),
            model_artifact_path: PathBuf::from(DEFAULT_MODEL_ARTIFACT_PATH),
            pricing_config_path: None,
            reference_year,
            comparison_min_population: 10,
            rate_limit_per_second: 10,
            rate_limit_burst: 20,
        }
    }
}
