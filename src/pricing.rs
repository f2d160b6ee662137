use crate::adjuster::{PriceBreakdown, PricingConfig, RuleBasedAdjuster};
use crate::encoder::{EncodedFeatures, FeatureEncoder, QuoteRequest};
use crate::errors::QuoteError;
use crate::money::Money;
use crate::pricing_model::PricingModel;
use std::sync::Arc;

/// A request that went through encoding, scoring and adjustment.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedRequest {
    pub features: EncodedFeatures,
    pub base_amount: f64,
    pub breakdown: PriceBreakdown,
}

impl PricedRequest {
    pub fn monthly(&self) -> Money {
        self.breakdown.total()
    }
}

/// Encoder → model → adjuster pipeline. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PremiumCalculator {
    encoder: FeatureEncoder,
    model: Arc<PricingModel>,
    adjuster: Arc<RuleBasedAdjuster>,
}

impl PremiumCalculator {
    pub fn new(encoder: FeatureEncoder, model: Arc<PricingModel>, config: PricingConfig) -> Self {
        Self {
            encoder,
            model,
            adjuster: Arc::new(RuleBasedAdjuster::new(config)),
        }
    }

    pub fn price(&self, request: &QuoteRequest) -> Result<PricedRequest, QuoteError> {
        let features = self.encoder.encode(request)?;
        let base_amount = self.model.predict(&features);
        let breakdown = self.adjuster.adjust(base_amount, request, &features);
        Ok(PricedRequest {
            features,
            base_amount,
            breakdown,
        })
    }

    pub fn yearly(&self, monthly: Money) -> Money {
        self.adjuster.yearly(monthly)
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn reference_year(&self) -> i32 {
        self.encoder.reference_year()
    }

    pub fn model(&self) -> &PricingModel {
        &self.model
    }

    pub fn config(&self) -> &PricingConfig {
        self.adjuster.config()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::{Brand, FuelType, Plan, Region, Sex, UsageType};
    use crate::pricing_model::tests::linear_artifact;
    use std::collections::BTreeSet;

    pub(crate) fn calculator() -> PremiumCalculator {
        let model = PricingModel::from_artifact(linear_artifact(200.0)).unwrap();
        PremiumCalculator::new(
            FeatureEncoder::new(2025),
            Arc::new(model),
            PricingConfig::default(),
        )
    }

    pub(crate) fn scenario_request() -> QuoteRequest {
        QuoteRequest {
            age: 25,
            sex: Sex::Male,
            smoker: false,
            vehicle_make: Brand::Maruti,
            vehicle_year: 2020,
            annual_mileage: 15_000,
            usage_type: UsageType::Personal,
            fuel_type: FuelType::Petrol,
            region: Region::Northeast,
            plan: Plan::Standard,
            addons: BTreeSet::new(),
        }
    }

    #[test]
    fn test_price_sums_breakdown() {
        let priced = calculator().price(&scenario_request()).unwrap();
        // intercept 1000 + 50 per year of age
        assert_eq!(priced.base_amount, 2250.0);
        assert_eq!(priced.monthly(), priced.breakdown.total());
        assert!(priced.breakdown.taxes.is_positive());
    }

    #[test]
    fn test_price_propagates_validation() {
        let mut request = scenario_request();
        request.vehicle_year = 2030;
        assert!(matches!(
            calculator().price(&request),
            Err(QuoteError::Validation {
                field: "vehicle_year",
                ..
            })
        ));
    }
}
