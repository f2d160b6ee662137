/// Property-based tests using proptest
/// Pricing and comparison invariants that must hold for every valid request
mod common;

use car_quote_engine::adjuster::PricingConfig;
use car_quote_engine::catalog::{
    Addon, Brand, ClosedSet, FuelType, Plan, Region, Sex, UsageType,
};
use car_quote_engine::comparator::percentile_of;
use car_quote_engine::encoder::{FeatureEncoder, QuoteRequest};
use car_quote_engine::money::Money;
use car_quote_engine::pricing::PremiumCalculator;
use car_quote_engine::pricing_model::PricingModel;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

fn shipped_calculator() -> PremiumCalculator {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/models/premium_model.json");
    let model = PricingModel::load(path).unwrap();
    PremiumCalculator::new(
        FeatureEncoder::new(common::REFERENCE_YEAR),
        Arc::new(model),
        PricingConfig::default(),
    )
}

fn pick<T: ClosedSet>(index: usize) -> T {
    T::ALL[index % T::ALL.len()]
}

prop_compose! {
    fn quote_request()(
        age in 18u32..=80,
        sex in 0usize..2,
        smoker in any::<bool>(),
        brand in 0usize..11,
        vehicle_year in 1980i32..=common::REFERENCE_YEAR,
        annual_mileage in 5_000u32..=30_000,
        usage in 0usize..3,
        fuel in 0usize..3,
        region in 0usize..4,
        plan in 0usize..3,
        addons in prop::collection::btree_set(0usize..6, 0..4),
    ) -> QuoteRequest {
        QuoteRequest {
            age,
            sex: pick::<Sex>(sex),
            smoker,
            vehicle_make: pick::<Brand>(brand),
            vehicle_year,
            annual_mileage,
            usage_type: pick::<UsageType>(usage),
            fuel_type: pick::<FuelType>(fuel),
            region: pick::<Region>(region),
            plan: pick::<Plan>(plan),
            addons: addons.into_iter().map(pick::<Addon>).collect::<BTreeSet<_>>(),
        }
    }
}

// Property: the breakdown is an exact decomposition of the monthly premium
proptest! {
    #[test]
    fn breakdown_sums_to_monthly(request in quote_request()) {
        let priced = shipped_calculator().price(&request).unwrap();
        let b = priced.breakdown;
        prop_assert_eq!(b.base + b.vehicle + b.addons + b.taxes, priced.monthly());
        for component in [b.base, b.vehicle, b.addons, b.taxes] {
            prop_assert!(!component.is_negative());
        }
    }

    #[test]
    fn yearly_applies_annual_discount(request in quote_request()) {
        let calculator = shipped_calculator();
        let monthly = calculator.price(&request).unwrap().monthly();
        // 12 months less 10%
        let expected = Money::new(monthly.amount() * Decimal::new(108, 1));
        prop_assert_eq!(calculator.yearly(monthly), expected);
    }

    #[test]
    fn pricing_is_deterministic(request in quote_request()) {
        let calculator = shipped_calculator();
        prop_assert_eq!(
            calculator.price(&request).unwrap(),
            calculator.price(&request).unwrap()
        );
    }
}

// Property: monotonicity in the rated risk factors
proptest! {
    #[test]
    fn smoking_never_lowers_premium(request in quote_request()) {
        let calculator = shipped_calculator();
        let mut non_smoker = request.clone();
        non_smoker.smoker = false;
        let mut smoker = request;
        smoker.smoker = true;
        prop_assert!(
            calculator.price(&smoker).unwrap().monthly()
                >= calculator.price(&non_smoker).unwrap().monthly()
        );
    }

    #[test]
    fn electric_never_raises_vehicle_component(request in quote_request()) {
        let calculator = shipped_calculator();
        let mut petrol = request.clone();
        petrol.fuel_type = FuelType::Petrol;
        let mut electric = request;
        electric.fuel_type = FuelType::Electric;
        prop_assert!(
            calculator.price(&electric).unwrap().breakdown.vehicle
                <= calculator.price(&petrol).unwrap().breakdown.vehicle
        );
    }
}

// Property: percentile is bounded and non-decreasing in the premium
proptest! {
    #[test]
    fn percentile_is_bounded(
        premiums in prop::collection::vec(0i64..500_000, 0..200),
        monthly in 0i64..500_000,
    ) {
        let premiums: Vec<Money> = premiums.into_iter().map(Money::from_paise).collect();
        let percentile = percentile_of(&premiums, Money::from_paise(monthly));
        prop_assert!((0.0..=100.0).contains(&percentile));
    }

    #[test]
    fn percentile_is_monotone(
        premiums in prop::collection::vec(0i64..500_000, 1..200),
        low in 0i64..500_000,
        step in 0i64..100_000,
    ) {
        let premiums: Vec<Money> = premiums.into_iter().map(Money::from_paise).collect();
        let lower = percentile_of(&premiums, Money::from_paise(low));
        let higher = percentile_of(&premiums, Money::from_paise(low + step));
        prop_assert!(lower <= higher);
    }
}
