use crate::comparator::Comparator;
use crate::encoder::parse_savings_profile;
use crate::errors::QuoteError;
use crate::explanation::ExplanationBuilder;
use crate::insights::{Dimension, InsightTable, InsightsAggregator, InsightsReport};
use crate::models::*;
use crate::pricing::PremiumCalculator;
use crate::pricing_model::PricingModel;
use crate::savings::total_potential_savings;
use std::sync::Arc;
use uuid::Uuid;

/// Prices a request and attaches the explanation and the population comparison.
#[derive(Debug, Clone)]
pub struct QuoteService {
    calculator: PremiumCalculator,
    explainer: ExplanationBuilder,
    comparator: Comparator,
}

impl QuoteService {
    pub fn new(calculator: PremiumCalculator, comparator: Comparator) -> Self {
        let baseline = calculator.config().baseline.clone();
        Self {
            explainer: ExplanationBuilder::new(calculator.clone(), baseline),
            calculator,
            comparator,
        }
    }

    /// Everything in the quote except its id. Identical bodies give identical details.
    pub fn details(&self, body: &QuoteRequestBody) -> Result<QuoteDetails, QuoteError> {
        let request = self.calculator.encoder().parse(body)?;
        let priced = self.calculator.price(&request)?;
        let monthly_premium = priced.monthly();
        let factors = self.explainer.explain(&request, &priced)?;
        let comparison = self.comparator.compare(&request, monthly_premium);

        Ok(QuoteDetails {
            monthly_premium,
            yearly_premium: self.calculator.yearly(monthly_premium),
            plan: request.plan,
            breakdown: priced.breakdown,
            features: CoverageFeatures::for_plan(request.plan, &request.addons),
            factors,
            comparison,
        })
    }

    pub fn quote(&self, body: &QuoteRequestBody) -> Result<Quote, QuoteError> {
        let details = self.details(body)?;
        let quote_id = Uuid::new_v4();

        tracing::info!(
            "Quote {} priced at {}/month (percentile {}, {} factors)",
            quote_id,
            details.monthly_premium,
            details.comparison.percentile,
            details.factors.len()
        );

        Ok(Quote { quote_id, details })
    }
}

/// Read-only views over the reference population.
#[derive(Clone)]
pub struct InsightsService {
    aggregator: InsightsAggregator,
}

impl InsightsService {
    pub fn new(aggregator: InsightsAggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &InsightsAggregator {
        &self.aggregator
    }

    pub async fn report(&self) -> InsightsReport {
        self.aggregator.report().await
    }

    /// One section by its wire name, `None` for an unknown name.
    pub async fn section(&self, name: &str) -> Option<Arc<InsightTable>> {
        let dimension = Dimension::from_section(name)?;
        Some(self.aggregator.aggregate(dimension).await)
    }

    pub async fn compare_brands(&self) -> BrandComparisonResponse {
        let table = self.aggregator.aggregate(Dimension::Brand).await;
        let brands = table
            .as_buckets()
            .map(|table| {
                table
                    .buckets
                    .iter()
                    .filter(|bucket| bucket.count > 0)
                    .map(|bucket| BrandSummary {
                        brand: bucket.key.clone(),
                        mean: bucket.avg_premium,
                        min: bucket.min_premium,
                        max: bucket.max_premium,
                        count: bucket.count,
                    })
                    .collect()
            })
            .unwrap_or_default();

        BrandComparisonResponse { brands }
    }

    pub async fn savings_tips(
        &self,
        body: &SavingsTipsRequest,
    ) -> Result<SavingsTipsResponse, QuoteError> {
        let profile = parse_savings_profile(body)?;
        let table = self.aggregator.aggregate(Dimension::SavingsTips).await;
        let tips = table
            .as_tips()
            .map(|tips| tips.contrasts.personalized_tips(&profile))
            .unwrap_or_default();

        tracing::debug!("Savings tips for {:?}: {} tips", profile, tips.len());

        Ok(SavingsTipsResponse {
            total_potential_savings: total_potential_savings(&tips),
            tips,
        })
    }
}

/// Static metadata of the loaded pricing model.
#[derive(Debug, Clone)]
pub struct MetricsService {
    model: Arc<PricingModel>,
}

impl MetricsService {
    pub fn new(model: Arc<PricingModel>) -> Self {
        Self { model }
    }

    pub fn metrics(&self) -> ModelMetricsResponse {
        ModelMetricsResponse::from_artifact(self.model.artifact(), self.model.scorer().kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::ComparatorConfig;
    use crate::pricing::tests::calculator;
    use crate::pricing_model::tests::linear_artifact;
    use crate::reference_data::ReferenceDataset;

    fn body() -> QuoteRequestBody {
        QuoteRequestBody {
            age: Some(25),
            sex: Some("male".into()),
            smoker: Some("no".into()),
            vehicle_make: Some("Maruti".into()),
            vehicle_year: Some(2020),
            annual_mileage: Some(15_000),
            usage_type: Some("Personal".into()),
            fuel_type: Some("Petrol".into()),
            region: Some("northeast".into()),
            ..QuoteRequestBody::default()
        }
    }

    fn service() -> QuoteService {
        let dataset = Arc::new(ReferenceDataset::from_records(Vec::new()));
        QuoteService::new(
            calculator(),
            Comparator::new(dataset, ComparatorConfig::default()),
        )
    }

    #[test]
    fn test_details_are_deterministic() {
        let service = service();
        assert_eq!(service.details(&body()).unwrap(), service.details(&body()).unwrap());
    }

    #[test]
    fn test_quote_ids_differ() {
        let service = service();
        let first = service.quote(&body()).unwrap();
        let second = service.quote(&body()).unwrap();
        assert_ne!(first.quote_id, second.quote_id);
        assert_eq!(first.details, second.details);
    }

    #[test]
    fn test_quote_breakdown_adds_up() {
        let details = service().details(&body()).unwrap();
        assert_eq!(details.breakdown.total(), details.monthly_premium);
        assert_eq!(details.plan, crate::catalog::Plan::Standard);
    }

    #[test]
    fn test_metrics_use_display_labels() {
        let model = PricingModel::from_artifact(linear_artifact(200.0)).unwrap();
        let metrics = MetricsService::new(Arc::new(model)).metrics();
        assert_eq!(metrics.status, "production_ready");
        assert_eq!(metrics.model_kind, "linear");
        assert_eq!(metrics.feature_importance[0].feature, "Smoking Status");
    }
}
