//! Closed value sets accepted by the quoting engine.
//!
//! Every categorical input (brand, fuel, plan, region, ...) is a Rust enum with a
//! fixed wire label. Parsing is case-insensitive; values outside the set give `None`
//! from [`ClosedSet::parse`] or an [`UnknownLabel`] from `FromStr`, which the feature
//! encoder turns into a field-specific validation error.
//! The derived bands (age group, vehicle-age band, mileage band) also live here since
//! the encoder, the comparator and the insights aggregator all group by them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// A label outside the closed set it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {set} '{value}', expected one of: {expected}")]
pub struct UnknownLabel {
    pub set: &'static str,
    pub value: String,
    pub expected: String,
}

/// A finite, ordered set of labelled values.
pub trait ClosedSet: Sized + Copy + 'static {
    /// All members in declaration order.
    const ALL: &'static [Self];

    /// Wire label of the member.
    fn label(self) -> &'static str;

    /// Case-insensitive lookup by wire label.
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|member| member.label().eq_ignore_ascii_case(raw))
    }

    /// Comma-separated list of accepted labels, used in error messages.
    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|member| member.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

macro_rules! closed_set {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl ClosedSet for $name {
            const ALL: &'static [Self] = &[$($name::$variant),+];

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.label())
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownLabel;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                <$name as ClosedSet>::parse(raw).ok_or_else(|| UnknownLabel {
                    set: stringify!($name),
                    value: raw.to_string(),
                    expected: <$name as ClosedSet>::expected(),
                })
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse::<$name>().map_err(serde::de::Error::custom)
            }
        }
    };
}

closed_set! {
    /// Applicant sex as collected by the quote form.
    pub enum Sex { Male => "male", Female => "female" }
}

closed_set! {
    /// Rating regions.
    pub enum Region {
        Northeast => "northeast",
        Northwest => "northwest",
        Southeast => "southeast",
        Southwest => "southwest",
    }
}

closed_set! {
    /// How the vehicle is used.
    pub enum UsageType {
        Personal => "Personal",
        Commercial => "Commercial",
        RideShare => "Ride-share",
    }
}

closed_set! {
    pub enum FuelType { Petrol => "Petrol", Diesel => "Diesel", Electric => "Electric" }
}

closed_set! {
    /// Coverage tiers sold on the quote form.
    pub enum Plan { Basic => "basic", Standard => "standard", Premium => "premium" }
}

closed_set! {
    /// Vehicle manufacturers the product is rated for.
    pub enum Brand {
        Maruti => "Maruti",
        Tata => "Tata",
        Hyundai => "Hyundai",
        Toyota => "Toyota",
        Honda => "Honda",
        Ford => "Ford",
        Chevrolet => "Chevrolet",
        Nissan => "Nissan",
        Bmw => "BMW",
        Mercedes => "Mercedes",
        Audi => "Audi",
    }
}

closed_set! {
    pub enum BrandTier { Economy => "economy", Mid => "mid", Luxury => "luxury" }
}

closed_set! {
    /// Optional coverages that can be bundled with a plan or bought on top of it.
    pub enum Addon {
        RoadsideAssistance => "roadside_assistance",
        PersonalAccident => "personal_accident",
        ZeroDepreciation => "zero_depreciation",
        EngineProtection => "engine_protection",
        RentalCar => "rental_car",
        Consumables => "consumables",
    }
}

impl Brand {
    /// Closed brand → tier mapping. There is no fallback tier.
    pub fn tier(self) -> BrandTier {
        match self {
            Brand::Maruti | Brand::Tata => BrandTier::Economy,
            Brand::Bmw | Brand::Mercedes | Brand::Audi => BrandTier::Luxury,
            Brand::Hyundai
            | Brand::Toyota
            | Brand::Honda
            | Brand::Ford
            | Brand::Chevrolet
            | Brand::Nissan => BrandTier::Mid,
        }
    }
}

impl BrandTier {
    /// Brands belonging to the tier, in declaration order.
    pub fn brands(self) -> Vec<Brand> {
        Brand::ALL
            .iter()
            .copied()
            .filter(|brand| brand.tier() == self)
            .collect()
    }
}

impl Plan {
    /// Add-ons included in the plan price.
    pub fn bundled_addons(self) -> &'static [Addon] {
        match self {
            Plan::Basic => &[],
            Plan::Standard => &[Addon::RoadsideAssistance, Addon::PersonalAccident],
            Plan::Premium => &[
                Addon::RoadsideAssistance,
                Addon::PersonalAccident,
                Addon::ZeroDepreciation,
                Addon::EngineProtection,
                Addon::RentalCar,
            ],
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Plan::Basic => "Basic",
            Plan::Standard => "Standard",
            Plan::Premium => "Premium",
        }
    }

    /// Number of cashless partner garages advertised for the tier.
    pub fn cashless_garages(self) -> &'static str {
        match self {
            Plan::Basic => "500+ garages",
            Plan::Standard => "3000+ garages",
            Plan::Premium => "5000+ garages",
        }
    }
}

impl Addon {
    pub fn display_name(self) -> &'static str {
        match self {
            Addon::RoadsideAssistance => "24/7 Roadside Assistance",
            Addon::PersonalAccident => "Personal Accident Cover",
            Addon::ZeroDepreciation => "Zero Depreciation",
            Addon::EngineProtection => "Engine Protection",
            Addon::RentalCar => "Rental Car Coverage",
            Addon::Consumables => "Consumables Cover",
        }
    }
}

// ============ Derived bands ============

closed_set! {
    /// Driver age bands.
    pub enum AgeGroup {
        Young => "Young (18-25)",
        Adult => "Adult (26-40)",
        Middle => "Middle (41-55)",
        Senior => "Senior (56+)",
    }
}

closed_set! {
    pub enum VehicleAgeBand {
        New => "New (0-2 years)",
        Recent => "Recent (3-5 years)",
        Older => "Older (6-8 years)",
        VeryOld => "Very Old (9+ years)",
    }
}

closed_set! {
    /// 5,000 km annual mileage bins. 30,000 km falls into the top bin.
    pub enum MileageBand {
        From5k => "5,000-10,000 km",
        From10k => "10,000-15,000 km",
        From15k => "15,000-20,000 km",
        From20k => "20,000-25,000 km",
        From25k => "25,000-30,000 km",
    }
}

impl AgeGroup {
    pub fn from_age(age: u32) -> Self {
        match age {
            0..=25 => AgeGroup::Young,
            26..=40 => AgeGroup::Adult,
            41..=55 => AgeGroup::Middle,
            _ => AgeGroup::Senior,
        }
    }

    /// Ordinal position used as a model feature.
    pub fn ordinal(self) -> u8 {
        match self {
            AgeGroup::Young => 0,
            AgeGroup::Adult => 1,
            AgeGroup::Middle => 2,
            AgeGroup::Senior => 3,
        }
    }
}

impl VehicleAgeBand {
    pub fn from_vehicle_age(years: u32) -> Self {
        match years {
            0..=2 => VehicleAgeBand::New,
            3..=5 => VehicleAgeBand::Recent,
            6..=8 => VehicleAgeBand::Older,
            _ => VehicleAgeBand::VeryOld,
        }
    }
}

impl MileageBand {
    pub const WIDTH_KM: u32 = 5_000;

    pub fn from_mileage(km: u32) -> Self {
        match km.saturating_sub(5_000) / Self::WIDTH_KM {
            0 => MileageBand::From5k,
            1 => MileageBand::From10k,
            2 => MileageBand::From15k,
            3 => MileageBand::From20k,
            _ => MileageBand::From25k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_trims() {
        assert_eq!(Brand::parse(" bmw "), Some(Brand::Bmw));
        assert_eq!(UsageType::parse("ride-share"), Some(UsageType::RideShare));
        assert_eq!(FuelType::parse("Hydrogen"), None);
    }

    #[test]
    fn test_from_str_names_the_set() {
        let err = "Tesla".parse::<Brand>().unwrap_err();
        assert_eq!(err.set, "Brand");
        assert_eq!(err.value, "Tesla");
        assert!(err.to_string().contains("Maruti"));
        assert_eq!("Diesel".parse::<FuelType>(), Ok(FuelType::Diesel));
    }

    #[test]
    fn test_brand_tiers_cover_closed_set() {
        assert_eq!(Brand::Maruti.tier(), BrandTier::Economy);
        assert_eq!(Brand::Audi.tier(), BrandTier::Luxury);
        assert_eq!(Brand::Nissan.tier(), BrandTier::Mid);
        let total: usize = BrandTier::ALL.iter().map(|t| t.brands().len()).sum();
        assert_eq!(total, Brand::ALL.len());
    }

    #[test]
    fn test_band_boundaries() {
        assert_eq!(AgeGroup::from_age(25), AgeGroup::Young);
        assert_eq!(AgeGroup::from_age(26), AgeGroup::Adult);
        assert_eq!(AgeGroup::from_age(56), AgeGroup::Senior);

        assert_eq!(VehicleAgeBand::from_vehicle_age(2), VehicleAgeBand::New);
        assert_eq!(VehicleAgeBand::from_vehicle_age(9), VehicleAgeBand::VeryOld);

        assert_eq!(MileageBand::from_mileage(5_000), MileageBand::From5k);
        assert_eq!(MileageBand::from_mileage(9_999), MileageBand::From5k);
        assert_eq!(MileageBand::from_mileage(15_000), MileageBand::From15k);
        assert_eq!(MileageBand::from_mileage(30_000), MileageBand::From25k);
    }

    #[test]
    fn test_serde_uses_wire_labels() {
        let json = serde_json::to_string(&UsageType::RideShare).unwrap();
        assert_eq!(json, "\"Ride-share\"");
        let plan: Plan = serde_json::from_str("\"PREMIUM\"").unwrap();
        assert_eq!(plan, Plan::Premium);
        assert!(serde_json::from_str::<Plan>("\"gold\"").is_err());
    }

    #[test]
    fn test_premium_plan_bundles_standard_addons() {
        for addon in Plan::Standard.bundled_addons() {
            assert!(Plan::Premium.bundled_addons().contains(addon));
        }
    }
}
