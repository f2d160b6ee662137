//! In-memory fixtures shared by the integration tests.
#![allow(dead_code)]

use axum::Router;
use car_quote_engine::adjuster::PricingConfig;
use car_quote_engine::app::build_router;
use car_quote_engine::catalog::{Brand, BrandTier, ClosedSet, FuelType, Region, Sex, UsageType};
use car_quote_engine::config::Config;
use car_quote_engine::encoder::{RiskProfile, FEATURE_COUNT, FEATURE_NAMES};
use car_quote_engine::handlers::AppState;
use car_quote_engine::money::Money;
use car_quote_engine::pricing_model::{
    DatasetInfo, EvaluationMetrics, FeatureImportance, LinearScorer, ModelArtifact, PricingModel,
    Scorer,
};
use car_quote_engine::reference_data::{ReferenceDataset, ReferenceRecord};
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;

pub const REFERENCE_YEAR: i32 = 2025;

pub fn test_config() -> Config {
    Config {
        port: 0,
        reference_data_path: PathBuf::from("data/reference_population.csv"),
        model_artifact_path: PathBuf::from("models/premium_model.json"),
        pricing_config_path: None,
        reference_year: REFERENCE_YEAR,
        comparison_min_population: 10,
        rate_limit_per_second: 10,
        rate_limit_burst: 20,
    }
}

fn weight_of(name: &str) -> f64 {
    match name {
        "age" => 2.0,
        "annual_mileage" => 0.01,
        "smoker" => 220.0,
        "tier_mid" => 60.0,
        "tier_luxury" => 180.0,
        "usage_commercial" => 90.0,
        "usage_rideshare" => 70.0,
        "fuel_electric" => -40.0,
        _ => 0.0,
    }
}

/// Linear model over raw (unscaled) features.
pub fn linear_artifact() -> ModelArtifact {
    let weights: Vec<f64> = FEATURE_NAMES.iter().map(|name| weight_of(name)).collect();
    let total: f64 = weights.iter().map(|w| w.abs()).sum();
    ModelArtifact {
        model_name: "Ridge Regression".to_string(),
        training_date: NaiveDate::from_ymd_opt(2025, 11, 5).unwrap(),
        feature_importance: FEATURE_NAMES
            .iter()
            .zip(&weights)
            .map(|(name, w)| FeatureImportance {
                feature: name.to_string(),
                importance: w.abs() / total * 100.0,
            })
            .collect(),
        scorer: Scorer::Linear(LinearScorer {
            intercept: 700.0,
            means: vec![0.0; FEATURE_COUNT],
            scales: vec![1.0; FEATURE_COUNT],
            weights,
        }),
        metrics: EvaluationMetrics {
            train_r2: 0.87,
            test_r2: 0.85,
            train_mae: 95.4,
            test_mae: 101.2,
            train_rmse: 131.0,
            test_rmse: 140.7,
        },
        hyperparameters: json!({ "alpha": 1.0 }).as_object().cloned().unwrap(),
        dataset_info: DatasetInfo {
            total_samples: 240,
            train_samples: 192,
            test_samples: 48,
            features: FEATURE_COUNT,
        },
    }
}

pub fn model() -> Arc<PricingModel> {
    Arc::new(PricingModel::from_artifact(linear_artifact()).unwrap())
}

/// 240 synthetic drivers covering every brand, fuel, usage and region.
pub fn dataset() -> Arc<ReferenceDataset> {
    let records = (0..240u32)
        .map(|i| {
            let brand = Brand::ALL[i as usize % Brand::ALL.len()];
            let smoker = i % 5 == 0;
            let fuel_type = FuelType::ALL[i as usize % 3];
            let usage_type = UsageType::ALL[(i as usize / 3) % 3];
            let age = 18 + (i * 7) % 63;
            let vehicle_age = i % 12;
            let annual_mileage = 5_000 + (i * 997) % 25_001;

            // ₹700 + ₹2 per year of age + ₹1 per 100 km, in paise
            let mut paise = 70_000 + 200 * i64::from(age) + i64::from(annual_mileage);
            paise += match brand.tier() {
                BrandTier::Economy => 0,
                BrandTier::Mid => 15_000,
                BrandTier::Luxury => 60_000,
            };
            if smoker {
                paise += 45_000;
            }
            if fuel_type == FuelType::Electric {
                paise -= 8_000;
            }
            if usage_type != UsageType::Personal {
                paise += 20_000;
            }

            ReferenceRecord {
                profile: RiskProfile {
                    age,
                    sex: if i % 2 == 0 { Sex::Male } else { Sex::Female },
                    smoker,
                    region: Region::ALL[i as usize % 4],
                    brand,
                    vehicle_age,
                    annual_mileage,
                    usage_type,
                    fuel_type,
                },
                vehicle_year: REFERENCE_YEAR - vehicle_age as i32,
                monthly_premium: Money::from_paise(paise),
            }
        })
        .collect();
    Arc::new(ReferenceDataset::from_records(records))
}

pub fn state() -> Arc<AppState> {
    Arc::new(AppState::from_components(
        test_config(),
        PricingConfig::default(),
        Ok(dataset()),
        Ok(model()),
    ))
}

pub fn app() -> Router {
    build_router(state(), None).unwrap()
}

pub fn app_without_model() -> Router {
    let state = AppState::from_components(
        test_config(),
        PricingConfig::default(),
        Ok(dataset()),
        Err("models/premium_model.json: No such file or directory".to_string()),
    );
    build_router(Arc::new(state), None).unwrap()
}

pub fn app_without_dataset() -> Router {
    let state = AppState::from_components(
        test_config(),
        PricingConfig::default(),
        Err("data/reference_population.csv: No such file or directory".to_string()),
        Ok(model()),
    );
    build_router(Arc::new(state), None).unwrap()
}

/// The reference scenario: 25, male, non-smoker, Maruti 2020, 15,000 km.
pub fn scenario_body() -> Value {
    json!({
        "age": 25,
        "sex": "male",
        "smoker": "no",
        "vehicle_make": "Maruti",
        "vehicle_year": 2020,
        "annual_mileage": 15000,
        "usage_type": "Personal",
        "fuel_type": "Petrol",
        "region": "northeast",
        "plan": "standard"
    })
}
