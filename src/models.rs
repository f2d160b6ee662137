use crate::adjuster::{covered_addons, PriceBreakdown};
use crate::catalog::{Addon, Plan};
use crate::comparator::ComparisonResult;
use crate::encoder::feature_label;
use crate::explanation::Factor;
use crate::money::Money;
use crate::pricing_model::{DatasetInfo, EvaluationMetrics, FeatureImportance, ModelArtifact};
use crate::savings::SavingsTip;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============ Request Models ============

/// Raw `POST /api/get-quote` body.
///
/// Every field is optional at the serde level so that a missing field is reported by
/// the feature encoder as a validation error naming the field, instead of a generic
/// deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuoteRequestBody {
    pub age: Option<i64>,
    pub sex: Option<String>,
    /// "yes" or "no".
    pub smoker: Option<String>,
    pub vehicle_make: Option<String>,
    pub vehicle_year: Option<i64>,
    pub annual_mileage: Option<i64>,
    pub usage_type: Option<String>,
    pub fuel_type: Option<String>,
    /// Defaults to northeast.
    pub region: Option<String>,
    /// Defaults to standard.
    pub plan: Option<String>,
    pub addons: Option<Vec<String>>,
}

/// Partial driver profile for `POST /api/savings-tips`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SavingsTipsRequest {
    pub vehicle_make: Option<String>,
    pub smoker: Option<String>,
    pub annual_mileage: Option<i64>,
    pub fuel_type: Option<String>,
    pub usage_type: Option<String>,
}

// ============ Quote Models ============

pub const LIABILITY_LIMIT: &str = "Up to ₹15 Lakh";
const NOT_INCLUDED: &str = "Not included";

/// Coverage strings shown under "What's Included" for the chosen plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoverageFeatures {
    pub liability: &'static str,
    pub collision: &'static str,
    pub roadside: &'static str,
    pub cashless: &'static str,
    pub accident: &'static str,
    /// Remaining covered add-ons (zero depreciation, engine protection, ...).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extras: Vec<&'static str>,
}

impl CoverageFeatures {
    pub fn for_plan(plan: Plan, requested: &BTreeSet<Addon>) -> Self {
        let covered = covered_addons(plan, requested);
        let describe = |addon: Addon, included: &'static str| {
            if covered.contains(&addon) {
                included
            } else {
                NOT_INCLUDED
            }
        };

        Self {
            liability: LIABILITY_LIMIT,
            collision: match plan {
                Plan::Basic => NOT_INCLUDED,
                Plan::Standard | Plan::Premium => "Included",
            },
            roadside: describe(Addon::RoadsideAssistance, "24/7 Assistance"),
            cashless: plan.cashless_garages(),
            accident: describe(Addon::PersonalAccident, Addon::PersonalAccident.display_name()),
            extras: covered
                .iter()
                .filter(|addon| {
                    !matches!(addon, Addon::RoadsideAssistance | Addon::PersonalAccident)
                })
                .map(|addon| addon.display_name())
                .collect(),
        }
    }
}

/// Everything in a quote that is a pure function of the request and model state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDetails {
    pub monthly_premium: Money,
    pub yearly_premium: Money,
    pub plan: Plan,
    pub breakdown: PriceBreakdown,
    pub features: CoverageFeatures,
    pub factors: Vec<Factor>,
    pub comparison: ComparisonResult,
}

/// `POST /api/get-quote` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    /// Fresh per request; used to correlate logs.
    pub quote_id: Uuid,
    #[serde(flatten)]
    pub details: QuoteDetails,
}

// ============ Metrics Models ============

pub const MODEL_STATUS: &str = "production_ready";

/// `GET /api/model-metrics` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetricsResponse {
    pub model_name: String,
    pub model_kind: &'static str,
    pub training_date: NaiveDate,
    pub metrics: EvaluationMetrics,
    /// Display-labelled importances, largest first.
    pub feature_importance: Vec<FeatureImportance>,
    pub hyperparameters: serde_json::Map<String, serde_json::Value>,
    pub dataset_info: DatasetInfo,
    pub status: &'static str,
}

impl ModelMetricsResponse {
    pub fn from_artifact(artifact: &ModelArtifact, model_kind: &'static str) -> Self {
        let mut feature_importance: Vec<FeatureImportance> = artifact
            .feature_importance
            .iter()
            .map(|entry| FeatureImportance {
                feature: feature_label(&entry.feature).to_string(),
                importance: entry.importance,
            })
            .collect();
        feature_importance.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Self {
            model_name: artifact.model_name.clone(),
            model_kind,
            training_date: artifact.training_date,
            metrics: artifact.metrics.clone(),
            feature_importance,
            hyperparameters: artifact.hyperparameters.clone(),
            dataset_info: artifact.dataset_info.clone(),
            status: MODEL_STATUS,
        }
    }
}

// ============ Insights Models ============

/// Monthly premium statistics for one brand.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandSummary {
    pub brand: String,
    pub mean: Money,
    pub min: Money,
    pub max: Money,
    pub count: usize,
}

/// `GET /api/compare-brands` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandComparisonResponse {
    pub brands: Vec<BrandSummary>,
}

/// `POST /api/savings-tips` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsTipsResponse {
    pub tips: Vec<SavingsTip>,
    /// Sum of the tips' savings in whole rupees per month.
    pub total_potential_savings: i64,
}

// ============ Service Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentStatus {
    Ready,
    Unavailable,
}

/// Load outcome of one startup component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentHealth {
    pub fn ready(detail: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Ready,
            detail: Some(detail.into()),
        }
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unavailable,
            detail: Some(reason.into()),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == ComponentStatus::Ready
    }
}

/// Readiness of the components loaded at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub model: ComponentHealth,
    pub dataset: ComponentHealth,
}

/// `GET /health` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    /// "healthy" when every component loaded, "degraded" otherwise.
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub components: Readiness,
}

/// `GET /` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_plan_features() {
        let features = CoverageFeatures::for_plan(Plan::Basic, &BTreeSet::new());
        assert_eq!(features.liability, LIABILITY_LIMIT);
        assert_eq!(features.collision, "Not included");
        assert_eq!(features.roadside, "Not included");
        assert_eq!(features.cashless, "500+ garages");
        assert!(features.extras.is_empty());
    }

    #[test]
    fn test_requested_addons_extend_features() {
        let requested = BTreeSet::from([Addon::RoadsideAssistance, Addon::Consumables]);
        let features = CoverageFeatures::for_plan(Plan::Basic, &requested);
        assert_eq!(features.roadside, "24/7 Assistance");
        assert_eq!(features.extras, vec!["Consumables Cover"]);
    }

    #[test]
    fn test_premium_plan_lists_bundled_extras() {
        let features = CoverageFeatures::for_plan(Plan::Premium, &BTreeSet::new());
        assert_eq!(features.accident, "Personal Accident Cover");
        assert_eq!(features.cashless, "5000+ garages");
        assert_eq!(features.extras.len(), 3);
        let json = serde_json::to_value(&features).unwrap();
        assert_eq!(json["collision"], "Included");
    }

    #[test]
    fn test_quote_body_tolerates_missing_fields() {
        let body: QuoteRequestBody = serde_json::from_str(r#"{"age": 30}"#).unwrap();
        assert_eq!(body.age, Some(30));
        assert!(body.vehicle_make.is_none());
    }
}
