//! Startup loading of the reference dataset, the pricing model and the pricing
//! constants, and assembly of the shared [`AppState`].
//!
//! A dataset or model that fails to load does not stop the server: the affected
//! endpoints answer 503 and `/health` reports the component as unavailable. An invalid
//! pricing override file is fatal.

use crate::adjuster::PricingConfig;
use crate::comparator::{Comparator, ComparatorConfig};
use crate::config::Config;
use crate::encoder::FeatureEncoder;
use crate::handlers::AppState;
use crate::insights::InsightsAggregator;
use crate::models::{ComponentHealth, Readiness};
use crate::pricing::PremiumCalculator;
use crate::pricing_model::PricingModel;
use crate::reference_data::ReferenceDataset;
use crate::services::{InsightsService, MetricsService, QuoteService};
use std::sync::Arc;

pub fn load_pricing_config(config: &Config) -> anyhow::Result<PricingConfig> {
    match &config.pricing_config_path {
        Some(path) => {
            let pricing = PricingConfig::from_file(path)?;
            tracing::info!("Pricing constants loaded from {}", path.display());
            Ok(pricing)
        }
        None => {
            tracing::info!("Using built-in pricing constants");
            Ok(PricingConfig::default())
        }
    }
}

/// Loads every component named by `config` and builds the application state.
pub fn build_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let pricing = load_pricing_config(&config)?;

    let dataset = ReferenceDataset::load(&config.reference_data_path)
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!("Failed to load reference dataset: {}", e);
            e.to_string()
        });

    let model = PricingModel::load(&config.model_artifact_path)
        .map(Arc::new)
        .map_err(|e| {
            tracing::error!("Failed to load pricing model: {}", e);
            e.to_string()
        });

    Ok(Arc::new(AppState::from_components(
        config, pricing, dataset, model,
    )))
}

impl AppState {
    /// Wires the services from already-loaded components. An `Err` component is
    /// recorded as unavailable together with its reason.
    pub fn from_components(
        config: Config,
        pricing: PricingConfig,
        dataset: Result<Arc<ReferenceDataset>, String>,
        model: Result<Arc<PricingModel>, String>,
    ) -> Self {
        let readiness = Readiness {
            model: match &model {
                Ok(model) => ComponentHealth::ready(format!(
                    "{} ({})",
                    model.artifact().model_name,
                    model.scorer().kind()
                )),
                Err(reason) => ComponentHealth::unavailable(reason.clone()),
            },
            dataset: match &dataset {
                Ok(dataset) => ComponentHealth::ready(format!(
                    "{} records, sha256 {}",
                    dataset.len(),
                    dataset.fingerprint()
                )),
                Err(reason) => ComponentHealth::unavailable(reason.clone()),
            },
        };

        let dataset = dataset.ok();
        let model = model.ok();

        let insights = dataset
            .as_ref()
            .map(|dataset| InsightsService::new(InsightsAggregator::new(Arc::clone(dataset))));

        let metrics = model
            .as_ref()
            .map(|model| MetricsService::new(Arc::clone(model)));

        let quotes = match (&model, &dataset) {
            (Some(model), Some(dataset)) => {
                let calculator = PremiumCalculator::new(
                    FeatureEncoder::new(config.reference_year),
                    Arc::clone(model),
                    pricing,
                );
                let comparator = Comparator::new(
                    Arc::clone(dataset),
                    ComparatorConfig {
                        min_population: config.comparison_min_population,
                    },
                );
                Some(QuoteService::new(calculator, comparator))
            }
            _ => {
                tracing::warn!("Quote endpoint disabled until the model and dataset are loaded");
                None
            }
        };

        Self {
            config,
            quotes,
            insights,
            metrics,
            readiness,
        }
    }
}
