//! "Why this price": counterfactual factor attribution.
//!
//! Each rule resets one attribute of the request to the baseline profile, re-prices the
//! request through the full pipeline and reports the signed change in the monthly
//! premium.

use crate::catalog::{Brand, FuelType, Plan, UsageType};
use crate::encoder::{QuoteRequest, MIN_VEHICLE_YEAR};
use crate::errors::QuoteError;
use crate::money::{group_thousands, Money};
use crate::pricing::{PremiumCalculator, PricedRequest};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The "average driver" every factor is measured against. Always a non-smoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineProfile {
    pub age: u32,
    pub annual_mileage: u32,
    pub vehicle_age: u32,
    pub brand: Brand,
    pub fuel_type: FuelType,
    pub usage_type: UsageType,
    pub plan: Plan,
}

impl Default for BaselineProfile {
    fn default() -> Self {
        Self {
            age: 40,
            annual_mileage: 15_000,
            vehicle_age: 4,
            brand: Brand::Hyundai,
            fuel_type: FuelType::Petrol,
            usage_type: UsageType::Personal,
            plan: Plan::Standard,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Increase,
    Decrease,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Factor {
    pub name: String,
    pub impact: Impact,
    pub magnitude: Money,
    pub detail: String,
}

impl Factor {
    fn from_delta(name: String, delta: Money) -> Self {
        let impact = if delta.is_positive() {
            Impact::Increase
        } else if delta.is_negative() {
            Impact::Decrease
        } else {
            Impact::Neutral
        };
        let magnitude = delta.abs();
        let detail = match impact {
            Impact::Increase => format!("Adds {}/month", magnitude),
            Impact::Decrease => format!("Saves {}/month", magnitude),
            Impact::Neutral => "No effect on your premium".to_string(),
        };
        Self {
            name,
            impact,
            magnitude,
            detail,
        }
    }
}

/// Pricing rules in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Smoking,
    Age,
    VehicleBrand,
    VehicleAge,
    AnnualMileage,
    FuelType,
    UsageType,
    PlanTier,
    Addons,
}

impl Rule {
    const ALL: [Rule; 9] = [
        Rule::Smoking,
        Rule::Age,
        Rule::VehicleBrand,
        Rule::VehicleAge,
        Rule::AnnualMileage,
        Rule::FuelType,
        Rule::UsageType,
        Rule::PlanTier,
        Rule::Addons,
    ];

    /// The request with this rule's attribute reset to the baseline.
    fn counterfactual(
        self,
        request: &QuoteRequest,
        baseline: &BaselineProfile,
        reference_year: i32,
    ) -> QuoteRequest {
        let mut cf = request.clone();
        match self {
            Rule::Smoking => cf.smoker = !request.smoker,
            Rule::Age => cf.age = baseline.age,
            Rule::VehicleBrand => cf.vehicle_make = baseline.brand,
            Rule::VehicleAge => {
                // the baseline age can reach back past the oldest quotable year
                cf.vehicle_year =
                    (reference_year - baseline.vehicle_age as i32).max(MIN_VEHICLE_YEAR)
            }
            Rule::AnnualMileage => cf.annual_mileage = baseline.annual_mileage,
            Rule::FuelType => cf.fuel_type = baseline.fuel_type,
            Rule::UsageType => cf.usage_type = baseline.usage_type,
            Rule::PlanTier => cf.plan = baseline.plan,
            Rule::Addons => cf.addons = BTreeSet::new(),
        }
        cf
    }

    fn name(self, request: &QuoteRequest, priced: &PricedRequest) -> String {
        match self {
            Rule::Smoking if request.smoker => "Smoking".to_string(),
            Rule::Smoking => "Non-smoker".to_string(),
            Rule::Age => format!("Your age ({})", request.age),
            Rule::VehicleBrand => format!(
                "Vehicle ({}, {} tier)",
                request.vehicle_make,
                priced.features.brand_tier()
            ),
            Rule::VehicleAge => match priced.features.vehicle_age() {
                1 => "Vehicle age (1 year)".to_string(),
                years => format!("Vehicle age ({} years)", years),
            },
            Rule::AnnualMileage => format!(
                "Annual mileage ({} km)",
                group_thousands(i64::from(request.annual_mileage))
            ),
            Rule::FuelType => format!("Fuel type ({})", request.fuel_type),
            Rule::UsageType => format!("Usage ({})", request.usage_type),
            Rule::PlanTier => format!("{} plan", request.plan.display_name()),
            Rule::Addons => "Optional add-ons".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExplanationBuilder {
    calculator: PremiumCalculator,
    baseline: BaselineProfile,
}

impl ExplanationBuilder {
    pub fn new(calculator: PremiumCalculator, baseline: BaselineProfile) -> Self {
        Self {
            calculator,
            baseline,
        }
    }

    /// Factors with a nonzero effect, largest first. Smoking status is always present.
    pub fn explain(
        &self,
        request: &QuoteRequest,
        priced: &PricedRequest,
    ) -> Result<Vec<Factor>, QuoteError> {
        let actual = priced.monthly();
        let reference_year = self.calculator.reference_year();
        let mut factors = Vec::new();

        for rule in Rule::ALL {
            let counterfactual = rule.counterfactual(request, &self.baseline, reference_year);
            let other = self.calculator.price(&counterfactual)?.monthly();
            let name = rule.name(request, priced);

            match rule {
                Rule::Smoking if request.smoker => {
                    factors.push(Factor::from_delta(name, actual - other));
                }
                Rule::Smoking => {
                    // What smoking would add, reported as a saving.
                    let avoided = other - actual;
                    factors.push(Factor::from_delta(name, Money::ZERO - avoided.abs()));
                }
                _ => {
                    let delta = actual - other;
                    if delta != Money::ZERO {
                        factors.push(Factor::from_delta(name, delta));
                    }
                }
            }
        }

        factors.sort_by(|a, b| b.magnitude.cmp(&a.magnitude));
        Ok(factors)
    }
}
