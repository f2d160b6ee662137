//! Rule-based adjuster: turns the model's base amount into an itemized monthly premium.

use crate::catalog::{Addon, BrandTier, FuelType, Plan, UsageType, VehicleAgeBand};
use crate::encoder::{
    EncodedFeatures, QuoteRequest, MAX_AGE, MAX_ANNUAL_MILEAGE, MIN_AGE, MIN_ANNUAL_MILEAGE,
};
use crate::explanation::BaselineProfile;
use crate::money::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

// ============ Configuration ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRates {
    pub basic: Decimal,
    pub standard: Decimal,
    pub premium: Decimal,
}

impl Default for PlanRates {
    fn default() -> Self {
        Self {
            basic: Decimal::from(599),
            standard: Decimal::from(999),
            premium: Decimal::from(1599),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierRates {
    pub economy: Decimal,
    pub mid: Decimal,
    pub luxury: Decimal,
}

impl Default for TierRates {
    fn default() -> Self {
        Self {
            economy: Decimal::from(90),
            mid: Decimal::from(150),
            luxury: Decimal::from(380),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleAgeMultipliers {
    pub new: Decimal,
    pub recent: Decimal,
    pub older: Decimal,
    pub very_old: Decimal,
}

impl Default for VehicleAgeMultipliers {
    fn default() -> Self {
        Self {
            new: Decimal::new(11, 1),
            recent: Decimal::ONE,
            older: Decimal::new(95, 2),
            very_old: Decimal::new(105, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelMultipliers {
    pub petrol: Decimal,
    pub diesel: Decimal,
    pub electric: Decimal,
}

impl Default for FuelMultipliers {
    fn default() -> Self {
        Self {
            petrol: Decimal::ONE,
            diesel: Decimal::new(105, 2),
            electric: Decimal::new(85, 2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageMultipliers {
    pub personal: Decimal,
    pub commercial: Decimal,
    pub ride_share: Decimal,
}

impl Default for UsageMultipliers {
    fn default() -> Self {
        Self {
            personal: Decimal::ONE,
            commercial: Decimal::new(135, 2),
            ride_share: Decimal::new(15, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddonCosts {
    pub roadside_assistance: Decimal,
    pub personal_accident: Decimal,
    pub zero_depreciation: Decimal,
    pub engine_protection: Decimal,
    pub rental_car: Decimal,
    pub consumables: Decimal,
}

impl Default for AddonCosts {
    fn default() -> Self {
        Self {
            roadside_assistance: Decimal::from(30),
            personal_accident: Decimal::from(45),
            zero_depreciation: Decimal::from(120),
            engine_protection: Decimal::from(80),
            rental_car: Decimal::from(60),
            consumables: Decimal::from(35),
        }
    }
}

/// Every constant used after the model prediction. Rupee amounts are monthly.
///
/// Loaded from an optional JSON file; any key left out keeps its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    pub plan_rates: PlanRates,
    /// Share of `base` taken from the plan rate; the rest comes from the model.
    pub plan_weight: Decimal,
    pub smoker_surcharge: Decimal,
    pub tier_rates: TierRates,
    pub vehicle_age_multipliers: VehicleAgeMultipliers,
    pub fuel_multipliers: FuelMultipliers,
    pub usage_multipliers: UsageMultipliers,
    pub addon_costs: AddonCosts,
    pub tax_rate: Decimal,
    pub annual_discount_rate: Decimal,
    /// Reference driver used when explaining a quote.
    pub baseline: BaselineProfile,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            plan_rates: PlanRates::default(),
            plan_weight: Decimal::new(7, 1),
            smoker_surcharge: Decimal::new(25, 2),
            tier_rates: TierRates::default(),
            vehicle_age_multipliers: VehicleAgeMultipliers::default(),
            fuel_multipliers: FuelMultipliers::default(),
            usage_multipliers: UsageMultipliers::default(),
            addon_costs: AddonCosts::default(),
            tax_rate: Decimal::new(18, 2),
            annual_discount_rate: Decimal::new(1, 1),
            baseline: BaselineProfile::default(),
        }
    }
}

impl PricingConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read pricing config {}: {}", path.display(), e)
        })?;
        let config: PricingConfig = serde_json::from_str(&raw).map_err(|e| {
            anyhow::anyhow!("Failed to parse pricing config {}: {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let amounts = [
            ("plan_rates.basic", self.plan_rates.basic),
            ("plan_rates.standard", self.plan_rates.standard),
            ("plan_rates.premium", self.plan_rates.premium),
            ("tier_rates.economy", self.tier_rates.economy),
            ("tier_rates.mid", self.tier_rates.mid),
            ("tier_rates.luxury", self.tier_rates.luxury),
            ("addon_costs.roadside_assistance", self.addon_costs.roadside_assistance),
            ("addon_costs.personal_accident", self.addon_costs.personal_accident),
            ("addon_costs.zero_depreciation", self.addon_costs.zero_depreciation),
            ("addon_costs.engine_protection", self.addon_costs.engine_protection),
            ("addon_costs.rental_car", self.addon_costs.rental_car),
            ("addon_costs.consumables", self.addon_costs.consumables),
            ("smoker_surcharge", self.smoker_surcharge),
        ];
        for (name, value) in amounts {
            if value < Decimal::ZERO {
                anyhow::bail!("{} must be a non-negative number, got {}", name, value);
            }
        }

        let multipliers = [
            ("vehicle_age_multipliers.new", self.vehicle_age_multipliers.new),
            ("vehicle_age_multipliers.recent", self.vehicle_age_multipliers.recent),
            ("vehicle_age_multipliers.older", self.vehicle_age_multipliers.older),
            ("vehicle_age_multipliers.very_old", self.vehicle_age_multipliers.very_old),
            ("fuel_multipliers.petrol", self.fuel_multipliers.petrol),
            ("fuel_multipliers.diesel", self.fuel_multipliers.diesel),
            ("fuel_multipliers.electric", self.fuel_multipliers.electric),
            ("usage_multipliers.personal", self.usage_multipliers.personal),
            ("usage_multipliers.commercial", self.usage_multipliers.commercial),
            ("usage_multipliers.ride_share", self.usage_multipliers.ride_share),
        ];
        for (name, value) in multipliers {
            if value <= Decimal::ZERO {
                anyhow::bail!("{} must be a positive number, got {}", name, value);
            }
        }

        if self.fuel_multipliers.electric > self.fuel_multipliers.petrol {
            anyhow::bail!("fuel_multipliers.electric must not exceed fuel_multipliers.petrol");
        }
        if !(Decimal::ZERO..=Decimal::ONE).contains(&self.plan_weight) {
            anyhow::bail!("plan_weight must be between 0 and 1");
        }
        if !(Decimal::ZERO..Decimal::ONE).contains(&self.tax_rate) {
            anyhow::bail!("tax_rate must be in [0, 1)");
        }
        if !(Decimal::ZERO..Decimal::ONE).contains(&self.annual_discount_rate) {
            anyhow::bail!("annual_discount_rate must be in [0, 1)");
        }
        if !(MIN_AGE..=MAX_AGE).contains(&self.baseline.age) {
            anyhow::bail!("baseline.age must be between {} and {}", MIN_AGE, MAX_AGE);
        }
        if !(MIN_ANNUAL_MILEAGE..=MAX_ANNUAL_MILEAGE).contains(&self.baseline.annual_mileage) {
            anyhow::bail!(
                "baseline.annual_mileage must be between {} and {}",
                MIN_ANNUAL_MILEAGE,
                MAX_ANNUAL_MILEAGE
            );
        }
        if self.baseline.vehicle_age > 40 {
            anyhow::bail!("baseline.vehicle_age must be at most 40 years");
        }
        Ok(())
    }

    pub fn plan_rate(&self, plan: Plan) -> Decimal {
        match plan {
            Plan::Basic => self.plan_rates.basic,
            Plan::Standard => self.plan_rates.standard,
            Plan::Premium => self.plan_rates.premium,
        }
    }

    pub fn tier_rate(&self, tier: BrandTier) -> Decimal {
        match tier {
            BrandTier::Economy => self.tier_rates.economy,
            BrandTier::Mid => self.tier_rates.mid,
            BrandTier::Luxury => self.tier_rates.luxury,
        }
    }

    pub fn vehicle_age_multiplier(&self, band: VehicleAgeBand) -> Decimal {
        match band {
            VehicleAgeBand::New => self.vehicle_age_multipliers.new,
            VehicleAgeBand::Recent => self.vehicle_age_multipliers.recent,
            VehicleAgeBand::Older => self.vehicle_age_multipliers.older,
            VehicleAgeBand::VeryOld => self.vehicle_age_multipliers.very_old,
        }
    }

    pub fn fuel_multiplier(&self, fuel: FuelType) -> Decimal {
        match fuel {
            FuelType::Petrol => self.fuel_multipliers.petrol,
            FuelType::Diesel => self.fuel_multipliers.diesel,
            FuelType::Electric => self.fuel_multipliers.electric,
        }
    }

    pub fn usage_multiplier(&self, usage: UsageType) -> Decimal {
        match usage {
            UsageType::Personal => self.usage_multipliers.personal,
            UsageType::Commercial => self.usage_multipliers.commercial,
            UsageType::RideShare => self.usage_multipliers.ride_share,
        }
    }

    pub fn addon_cost(&self, addon: Addon) -> Decimal {
        match addon {
            Addon::RoadsideAssistance => self.addon_costs.roadside_assistance,
            Addon::PersonalAccident => self.addon_costs.personal_accident,
            Addon::ZeroDepreciation => self.addon_costs.zero_depreciation,
            Addon::EngineProtection => self.addon_costs.engine_protection,
            Addon::RentalCar => self.addon_costs.rental_car,
            Addon::Consumables => self.addon_costs.consumables,
        }
    }
}

// ============ Breakdown ============

/// Itemized monthly premium. The four components always sum to the monthly premium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceBreakdown {
    pub base: Money,
    pub vehicle: Money,
    pub addons: Money,
    pub taxes: Money,
}

impl PriceBreakdown {
    pub fn total(&self) -> Money {
        self.base + self.vehicle + self.addons + self.taxes
    }
}

#[derive(Debug, Clone)]
pub struct RuleBasedAdjuster {
    config: PricingConfig,
}

impl RuleBasedAdjuster {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Applies plan blending, smoker surcharge, vehicle and add-on pricing, then tax.
    pub fn adjust(
        &self,
        base_amount: f64,
        request: &QuoteRequest,
        features: &EncodedFeatures,
    ) -> PriceBreakdown {
        let config = &self.config;

        let mut base = config.plan_weight * config.plan_rate(request.plan)
            + (Decimal::ONE - config.plan_weight) * model_signal(base_amount);
        if request.smoker {
            base *= Decimal::ONE + config.smoker_surcharge;
        }

        let vehicle = config.tier_rate(features.brand_tier())
            * config.vehicle_age_multiplier(features.vehicle_age_band())
            * config.fuel_multiplier(request.fuel_type)
            * config.usage_multiplier(request.usage_type);

        let addons: Decimal = covered_addons(request.plan, &request.addons)
            .into_iter()
            .map(|addon| config.addon_cost(addon))
            .sum();

        let base_money = Money::new(base);
        let vehicle_money = Money::new(vehicle);
        let addons_money = Money::new(addons);
        let subtotal = base_money + vehicle_money + addons_money;

        // taxes absorb the rounding so the components sum to the monthly total
        let monthly = Money::new((base + vehicle + addons) * (Decimal::ONE + config.tax_rate));
        let taxes = if monthly < subtotal {
            Money::ZERO
        } else {
            monthly - subtotal
        };

        PriceBreakdown {
            base: base_money,
            vehicle: vehicle_money,
            addons: addons_money,
            taxes,
        }
    }

    /// Yearly premium after the annual-payment discount, rounded to the paisa.
    pub fn yearly(&self, monthly: Money) -> Money {
        monthly.scale(Decimal::from(12) * (Decimal::ONE - self.config.annual_discount_rate))
    }
}

/// Model predictions are clamped to this many rupees before blending.
pub const MAX_MODEL_SIGNAL: i64 = 10_000_000;

/// Model prediction as a paise-rounded amount in `[0, MAX_MODEL_SIGNAL]`; non-finite becomes 0.
fn model_signal(base_amount: f64) -> Decimal {
    if !base_amount.is_finite() {
        return Decimal::ZERO;
    }
    let clamped = base_amount.clamp(0.0, MAX_MODEL_SIGNAL as f64);
    Decimal::from_f64_retain(clamped)
        .map(|signal| signal.round_dp(2))
        .unwrap_or(Decimal::ZERO)
}

/// Plan-bundled add-ons plus the requested extras, without duplicates.
pub fn covered_addons(plan: Plan, requested: &BTreeSet<Addon>) -> BTreeSet<Addon> {
    plan.bundled_addons()
        .iter()
        .copied()
        .chain(requested.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Brand, Region, Sex};
    use crate::encoder::FeatureEncoder;

    fn request() -> QuoteRequest {
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

    fn price(request: &QuoteRequest, base_amount: f64) -> PriceBreakdown {
        let features = FeatureEncoder::new(2025).encode(request).unwrap();
        RuleBasedAdjuster::new(PricingConfig::default()).adjust(base_amount, request, &features)
    }

    #[test]
    fn test_breakdown_components() {
        let breakdown = price(&request(), 500.0);
        // 0.7 * 999 + 0.3 * 500
        assert_eq!(breakdown.base, Money::from_paise(84_930));
        // economy, recent, petrol, personal
        assert_eq!(breakdown.vehicle, Money::from_paise(9_000));
        // roadside + personal accident bundled with standard
        assert_eq!(breakdown.addons, Money::from_paise(7_500));
        assert_eq!(breakdown.total(), Money::from_paise(119_687));
        assert!(breakdown.taxes.is_positive());
    }

    #[test]
    fn test_negative_prediction_is_floored() {
        assert_eq!(price(&request(), -250.0), price(&request(), 0.0));
    }

    #[test]
    fn test_smoker_surcharge_applies_to_base() {
        let plain = price(&request(), 500.0);
        let mut smoker = request();
        smoker.smoker = true;
        let surcharged = price(&smoker, 500.0);
        // (0.7 * 999 + 0.3 * 500) * 1.25 = 1061.625
        assert_eq!(surcharged.base, Money::from_paise(106_163));
        assert!(surcharged.total() > plain.total());
    }

    #[test]
    fn test_bundled_addon_is_not_charged_twice() {
        let mut with_dup = request();
        with_dup.addons.insert(Addon::RoadsideAssistance);
        assert_eq!(price(&with_dup, 500.0), price(&request(), 500.0));

        let mut with_extra = request();
        with_extra.addons.insert(Addon::Consumables);
        assert_eq!(
            price(&with_extra, 500.0).addons,
            Money::from_paise(7_500 + 3_500)
        );
    }

    #[test]
    fn test_electric_lowers_vehicle_component() {
        let mut electric = request();
        electric.fuel_type = FuelType::Electric;
        assert!(price(&electric, 500.0).vehicle < price(&request(), 500.0).vehicle);
    }

    #[test]
    fn test_unbounded_prediction_is_clamped() {
        assert_eq!(price(&request(), f64::NAN), price(&request(), 0.0));
        assert_eq!(price(&request(), f64::INFINITY), price(&request(), 0.0));
        let capped = price(&request(), MAX_MODEL_SIGNAL as f64);
        assert_eq!(price(&request(), 1e300), capped);
    }

    #[test]
    fn test_taxes_absorb_rounding() {
        // 0.7 * 599 + 0.3 * 0.01 leaves a third of a paisa on the base
        let mut basic = request();
        basic.plan = Plan::Basic;
        let breakdown = price(&basic, 0.01);
        assert_eq!(breakdown.base, Money::from_paise(41_930));
        let expected = Money::new(
            (Decimal::new(419_303, 3) + Decimal::from(90)) * Decimal::new(118, 2),
        );
        assert_eq!(breakdown.total(), expected);
    }

    #[test]
    fn test_yearly_applies_discount() {
        let adjuster = RuleBasedAdjuster::new(PricingConfig::default());
        assert_eq!(
            adjuster.yearly(Money::from_paise(100_000)),
            Money::from_paise(1_080_000)
        );
        assert_eq!(adjuster.yearly(Money::from_paise(1)), Money::from_paise(11));
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: PricingConfig =
            serde_json::from_str(r#"{"tax_rate": 0.12, "plan_rates": {"basic": 499}}"#).unwrap();
        assert_eq!(config.tax_rate, Decimal::new(12, 2));
        assert_eq!(config.plan_rates.basic, Decimal::from(499));
        assert_eq!(config.plan_rates.standard, Decimal::from(999));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_electric_surcharge() {
        let mut config = PricingConfig::default();
        config.fuel_multipliers.electric = Decimal::new(12, 1);
        assert!(config.validate().is_err());
    }
}
