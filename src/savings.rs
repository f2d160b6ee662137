//! Savings tips derived from premium contrasts in the reference population.

use crate::catalog::{Brand, BrandTier, FuelType, UsageType, VehicleAgeBand};
use crate::encoder::HIGH_MILEAGE_KM;
use crate::money::Money;
use crate::reference_data::{ReferenceDataset, ReferenceRecord};
use serde::Serialize;

/// Average premium differences between a costly group and its cheaper alternative.
/// `None` when either side has no records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SavingsContrasts {
    pub luxury_vs_economy: Option<Money>,
    pub smoker_vs_non_smoker: Option<Money>,
    pub high_vs_low_mileage: Option<Money>,
    pub new_vs_recent_vehicle: Option<Money>,
    pub petrol_vs_electric: Option<Money>,
    pub commercial_vs_personal: Option<Money>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TipImpact {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavingsTip {
    pub tip: String,
    pub savings: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impact: Option<TipImpact>,
    #[serde(skip)]
    pub amount: Money,
}

impl SavingsTip {
    fn new(tip: impl Into<String>, amount: Money, impact: Option<TipImpact>) -> Self {
        let amount = if amount.is_negative() { Money::ZERO } else { amount };
        Self {
            tip: tip.into(),
            savings: format!("{}/month", amount),
            impact,
            amount,
        }
    }
}

/// Partial driver profile used to pick personalized tips.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SavingsProfile {
    pub vehicle_make: Option<Brand>,
    pub smoker: Option<bool>,
    pub annual_mileage: Option<u32>,
    pub fuel_type: Option<FuelType>,
    pub usage_type: Option<UsageType>,
}

fn mean_where(
    records: &[ReferenceRecord],
    keep: impl Fn(&ReferenceRecord) -> bool,
) -> Option<Money> {
    Money::mean(
        records
            .iter()
            .filter(|r| keep(*r))
            .map(|r| r.monthly_premium),
    )
}

fn difference(costly: Option<Money>, cheap: Option<Money>) -> Option<Money> {
    Some(costly? - cheap?)
}

impl SavingsContrasts {
    pub fn from_dataset(dataset: &ReferenceDataset) -> Self {
        let records = dataset.records();
        let tier = |t: BrandTier| move |r: &ReferenceRecord| r.profile.brand.tier() == t;
        let band = |b: VehicleAgeBand| {
            move |r: &ReferenceRecord| VehicleAgeBand::from_vehicle_age(r.profile.vehicle_age) == b
        };

        Self {
            luxury_vs_economy: difference(
                mean_where(records, tier(BrandTier::Luxury)),
                mean_where(records, tier(BrandTier::Economy)),
            ),
            smoker_vs_non_smoker: difference(
                mean_where(records, |r| r.profile.smoker),
                mean_where(records, |r| !r.profile.smoker),
            ),
            high_vs_low_mileage: difference(
                mean_where(records, |r| r.profile.annual_mileage > HIGH_MILEAGE_KM),
                mean_where(records, |r| r.profile.annual_mileage <= HIGH_MILEAGE_KM),
            ),
            new_vs_recent_vehicle: difference(
                mean_where(records, band(VehicleAgeBand::New)),
                mean_where(records, band(VehicleAgeBand::Recent)),
            ),
            petrol_vs_electric: difference(
                mean_where(records, |r| r.profile.fuel_type == FuelType::Petrol),
                mean_where(records, |r| r.profile.fuel_type == FuelType::Electric),
            ),
            commercial_vs_personal: difference(
                mean_where(records, |r| r.profile.usage_type != UsageType::Personal),
                mean_where(records, |r| r.profile.usage_type == UsageType::Personal),
            ),
        }
    }

    /// Population-wide tips shown on the insights page.
    pub fn general_tips(&self) -> Vec<SavingsTip> {
        [
            ("Choose an economy vehicle", self.luxury_vs_economy),
            ("Quit smoking", self.smoker_vs_non_smoker),
            ("Lower your annual mileage", self.high_vs_low_mileage),
            ("Buy a 3-5 year old vehicle", self.new_vs_recent_vehicle),
            ("Choose electric", self.petrol_vs_electric),
        ]
        .into_iter()
        .filter_map(|(tip, amount)| amount.map(|a| SavingsTip::new(tip, a, None)))
        .collect()
    }

    /// Tips that apply to the given profile, each with its expected impact.
    pub fn personalized_tips(&self, profile: &SavingsProfile) -> Vec<SavingsTip> {
        let mut tips = Vec::new();
        let mut push = |applies: bool, tip: String, amount: Option<Money>, impact: TipImpact| {
            if let (true, Some(amount)) = (applies, amount) {
                tips.push(SavingsTip::new(tip, amount, Some(impact)));
            }
        };

        let economy = BrandTier::Economy
            .brands()
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        push(
            profile.vehicle_make.map(|b| b.tier()) == Some(BrandTier::Luxury),
            format!("Switch to an economy vehicle ({})", economy),
            self.luxury_vs_economy,
            TipImpact::High,
        );
        push(
            profile.smoker == Some(true),
            "Quit smoking".to_string(),
            self.smoker_vs_non_smoker,
            TipImpact::High,
        );
        push(
            profile.annual_mileage.is_some_and(|km| km > HIGH_MILEAGE_KM),
            "Reduce annual mileage below 20,000 km".to_string(),
            self.high_vs_low_mileage,
            TipImpact::Medium,
        );
        push(
            matches!(profile.fuel_type, Some(FuelType::Petrol | FuelType::Diesel)),
            "Consider an electric vehicle".to_string(),
            self.petrol_vs_electric,
            TipImpact::Low,
        );
        push(
            matches!(
                profile.usage_type,
                Some(UsageType::Commercial | UsageType::RideShare)
            ),
            "Switch to personal use only".to_string(),
            self.commercial_vs_personal,
            TipImpact::High,
        );

        tips
    }
}

/// Sum of the displayed savings, in whole rupees.
pub fn total_potential_savings(tips: &[SavingsTip]) -> i64 {
    tips.iter().map(|tip| tip.amount.whole_rupees()).sum()
}
