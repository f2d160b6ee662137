//! Feature encoder: validates raw quote requests and derives the model feature vector.
//!
//! All request validation happens here. Downstream components (pricing model,
//! adjuster, comparator) only ever see a typed [`QuoteRequest`] and the immutable
//! [`EncodedFeatures`] built from it.

use crate::catalog::{
    Addon, AgeGroup, Brand, BrandTier, ClosedSet, FuelType, MileageBand, Plan, Region, Sex,
    UnknownLabel, UsageType, VehicleAgeBand,
};
use crate::errors::QuoteError;
use crate::models::{QuoteRequestBody, SavingsTipsRequest};
use crate::savings::SavingsProfile;
use std::collections::BTreeSet;
use std::str::FromStr;

pub const MIN_AGE: u32 = 18;
pub const MAX_AGE: u32 = 80;
pub const MIN_ANNUAL_MILEAGE: u32 = 5_000;
pub const MAX_ANNUAL_MILEAGE: u32 = 30_000;
pub const MIN_VEHICLE_YEAR: i32 = 1980;

/// Annual mileage above which the high-mileage flag is set.
pub const HIGH_MILEAGE_KM: u32 = 20_000;
/// Vehicle age above which the old-vehicle flag is set.
pub const OLD_VEHICLE_YEARS: u32 = 7;

/// Model feature names, in vector order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "annual_mileage",
    "vehicle_age",
    "sex_male",
    "smoker",
    "region_northwest",
    "region_southeast",
    "region_southwest",
    "tier_mid",
    "tier_luxury",
    "usage_commercial",
    "usage_rideshare",
    "fuel_diesel",
    "fuel_electric",
    "high_mileage",
    "old_vehicle",
    "age_group",
];

pub const FEATURE_COUNT: usize = 17;

/// Index of the smoker indicator in the feature vector.
pub const SMOKER_FEATURE: usize = 4;

/// Human-readable label for a model feature name.
pub fn feature_label(name: &str) -> &str {
    match name {
        "age" => "Age",
        "annual_mileage" => "Annual Mileage",
        "vehicle_age" => "Vehicle Age",
        "sex_male" => "Gender",
        "smoker" => "Smoking Status",
        "region_northwest" => "Region (Northwest)",
        "region_southeast" => "Region (Southeast)",
        "region_southwest" => "Region (Southwest)",
        "tier_mid" => "Vehicle Category (Mid-range)",
        "tier_luxury" => "Vehicle Category (Luxury)",
        "usage_commercial" => "Usage Type (Commercial)",
        "usage_rideshare" => "Usage Type (Ride-share)",
        "fuel_diesel" => "Fuel Type (Diesel)",
        "fuel_electric" => "Fuel Type (Electric)",
        "high_mileage" => "High Mileage Flag",
        "old_vehicle" => "Old Vehicle Flag",
        "age_group" => "Age Group",
        other => other,
    }
}

/// Validated quote request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub age: u32,
    pub sex: Sex,
    pub smoker: bool,
    pub vehicle_make: Brand,
    pub vehicle_year: i32,
    pub annual_mileage: u32,
    pub usage_type: UsageType,
    pub fuel_type: FuelType,
    pub region: Region,
    pub plan: Plan,
    pub addons: BTreeSet<Addon>,
}

/// The model-relevant attributes of a driver and vehicle.
///
/// Shared by live requests and historical reference records so both are encoded the
/// same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskProfile {
    pub age: u32,
    pub sex: Sex,
    pub smoker: bool,
    pub region: Region,
    pub brand: Brand,
    pub vehicle_age: u32,
    pub annual_mileage: u32,
    pub usage_type: UsageType,
    pub fuel_type: FuelType,
}

/// Numeric feature vector plus the derived bands it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFeatures {
    profile: RiskProfile,
    age_group: AgeGroup,
    vehicle_age_band: VehicleAgeBand,
    mileage_band: MileageBand,
    brand_tier: BrandTier,
    values: [f64; FEATURE_COUNT],
}

impl EncodedFeatures {
    pub fn from_profile(profile: RiskProfile) -> Self {
        let age_group = AgeGroup::from_age(profile.age);
        let brand_tier = profile.brand.tier();
        let flag = |on: bool| if on { 1.0 } else { 0.0 };

        let values = [
            f64::from(profile.age),
            f64::from(profile.annual_mileage),
            f64::from(profile.vehicle_age),
            flag(profile.sex == Sex::Male),
            flag(profile.smoker),
            flag(profile.region == Region::Northwest),
            flag(profile.region == Region::Southeast),
            flag(profile.region == Region::Southwest),
            flag(brand_tier == BrandTier::Mid),
            flag(brand_tier == BrandTier::Luxury),
            flag(profile.usage_type == UsageType::Commercial),
            flag(profile.usage_type == UsageType::RideShare),
            flag(profile.fuel_type == FuelType::Diesel),
            flag(profile.fuel_type == FuelType::Electric),
            flag(profile.annual_mileage > HIGH_MILEAGE_KM),
            flag(profile.vehicle_age > OLD_VEHICLE_YEARS),
            f64::from(age_group.ordinal()),
        ];

        Self {
            profile,
            age_group,
            vehicle_age_band: VehicleAgeBand::from_vehicle_age(profile.vehicle_age),
            mileage_band: MileageBand::from_mileage(profile.annual_mileage),
            brand_tier,
            values,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn profile(&self) -> &RiskProfile {
        &self.profile
    }

    pub fn age_group(&self) -> AgeGroup {
        self.age_group
    }

    pub fn vehicle_age(&self) -> u32 {
        self.profile.vehicle_age
    }

    pub fn vehicle_age_band(&self) -> VehicleAgeBand {
        self.vehicle_age_band
    }

    pub fn mileage_band(&self) -> MileageBand {
        self.mileage_band
    }

    pub fn brand_tier(&self) -> BrandTier {
        self.brand_tier
    }
}

/// Validates requests and builds feature vectors relative to a fixed reference year.
#[derive(Debug, Clone, Copy)]
pub struct FeatureEncoder {
    reference_year: i32,
}

impl FeatureEncoder {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Turns the wire body into a typed request, naming the first offending field.
    pub fn parse(&self, body: &QuoteRequestBody) -> Result<QuoteRequest, QuoteError> {
        let age = required(body.age, "age")?;
        let sex = parse_closed::<Sex>(body.sex.as_deref(), "sex")?;
        let smoker = parse_smoker(body.smoker.as_deref())?;

        let make = body
            .vehicle_make
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .ok_or_else(|| QuoteError::validation("vehicle_make", "is required"))?;
        let vehicle_make = Brand::parse(make).ok_or_else(|| QuoteError::UnknownBrand {
            value: make.to_string(),
        })?;

        let vehicle_year = required(body.vehicle_year, "vehicle_year")?;
        let annual_mileage = required(body.annual_mileage, "annual_mileage")?;
        let usage_type = parse_closed::<UsageType>(body.usage_type.as_deref(), "usage_type")?;
        let fuel_type = parse_closed::<FuelType>(body.fuel_type.as_deref(), "fuel_type")?;
        let region = match body.region.as_deref() {
            None => Region::Northeast,
            raw => parse_closed::<Region>(raw, "region")?,
        };
        let plan = match body.plan.as_deref() {
            None => Plan::Standard,
            raw => parse_closed::<Plan>(raw, "plan")?,
        };

        let mut addons = BTreeSet::new();
        for raw in body.addons.iter().flatten() {
            let addon = Addon::parse(raw).ok_or_else(|| {
                QuoteError::validation(
                    "addons",
                    format!(
                        "unknown add-on '{}', expected any of: {}",
                        raw,
                        Addon::expected()
                    ),
                )
            })?;
            addons.insert(addon);
        }

        let request = QuoteRequest {
            age: to_u32(age, "age")?,
            sex,
            smoker,
            vehicle_make,
            vehicle_year: i32::try_from(vehicle_year)
                .map_err(|_| QuoteError::validation("vehicle_year", "is out of range"))?,
            annual_mileage: to_u32(annual_mileage, "annual_mileage")?,
            usage_type,
            fuel_type,
            region,
            plan,
            addons,
        };

        self.check_ranges(&request)?;
        Ok(request)
    }

    /// Builds the feature vector. Pure; fails only on out-of-range numerics.
    pub fn encode(&self, request: &QuoteRequest) -> Result<EncodedFeatures, QuoteError> {
        self.check_ranges(request)?;
        let vehicle_age = (self.reference_year - request.vehicle_year).max(0) as u32;

        Ok(EncodedFeatures::from_profile(RiskProfile {
            age: request.age,
            sex: request.sex,
            smoker: request.smoker,
            region: request.region,
            brand: request.vehicle_make,
            vehicle_age,
            annual_mileage: request.annual_mileage,
            usage_type: request.usage_type,
            fuel_type: request.fuel_type,
        }))
    }

    fn check_ranges(&self, request: &QuoteRequest) -> Result<(), QuoteError> {
        if !(MIN_AGE..=MAX_AGE).contains(&request.age) {
            return Err(QuoteError::validation(
                "age",
                format!("must be between {} and {}", MIN_AGE, MAX_AGE),
            ));
        }
        if request.vehicle_year > self.reference_year {
            return Err(QuoteError::validation(
                "vehicle_year",
                format!("must not be later than {}", self.reference_year),
            ));
        }
        if request.vehicle_year < MIN_VEHICLE_YEAR {
            return Err(QuoteError::validation(
                "vehicle_year",
                format!("must not be earlier than {}", MIN_VEHICLE_YEAR),
            ));
        }
        if !(MIN_ANNUAL_MILEAGE..=MAX_ANNUAL_MILEAGE).contains(&request.annual_mileage) {
            return Err(QuoteError::validation(
                "annual_mileage",
                format!(
                    "must be between {} and {}",
                    MIN_ANNUAL_MILEAGE, MAX_ANNUAL_MILEAGE
                ),
            ));
        }
        Ok(())
    }
}

/// Validates the partial profile sent to the savings-tips endpoint. Every field is
/// optional, but a present field must be well formed.
pub fn parse_savings_profile(body: &SavingsTipsRequest) -> Result<SavingsProfile, QuoteError> {
    let vehicle_make = match body.vehicle_make.as_deref() {
        None => None,
        Some(raw) => Some(Brand::parse(raw).ok_or_else(|| QuoteError::UnknownBrand {
            value: raw.to_string(),
        })?),
    };
    let smoker = match body.smoker.as_deref() {
        None => None,
        raw => Some(parse_smoker(raw)?),
    };
    let annual_mileage = body
        .annual_mileage
        .map(|km| to_u32(km, "annual_mileage"))
        .transpose()?;
    let fuel_type = match body.fuel_type.as_deref() {
        None => None,
        raw => Some(parse_closed::<FuelType>(raw, "fuel_type")?),
    };
    let usage_type = match body.usage_type.as_deref() {
        None => None,
        raw => Some(parse_closed::<UsageType>(raw, "usage_type")?),
    };

    Ok(SavingsProfile {
        vehicle_make,
        smoker,
        annual_mileage,
        fuel_type,
        usage_type,
    })
}

fn required(value: Option<i64>, field: &'static str) -> Result<i64, QuoteError> {
    value.ok_or_else(|| QuoteError::validation(field, "is required"))
}

fn to_u32(value: i64, field: &'static str) -> Result<u32, QuoteError> {
    u32::try_from(value).map_err(|_| QuoteError::validation(field, "must be a positive number"))
}

fn parse_closed<T>(raw: Option<&str>, field: &'static str) -> Result<T, QuoteError>
where
    T: ClosedSet + FromStr<Err = UnknownLabel>,
{
    let raw = raw.ok_or_else(|| QuoteError::validation(field, "is required"))?;
    raw.parse::<T>().map_err(|err| {
        QuoteError::validation(
            field,
            format!("unknown value '{}', expected one of: {}", err.value, err.expected),
        )
    })
}

fn parse_smoker(raw: Option<&str>) -> Result<bool, QuoteError> {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("yes") => Ok(true),
        Some("no") => Ok(false),
        Some(other) => Err(QuoteError::validation(
            "smoker",
            format!("unknown value '{}', expected one of: yes, no", other),
        )),
        None => Err(QuoteError::validation("smoker", "is required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
            plan: None,
            addons: None,
        }
    }

    fn field_of(err: QuoteError) -> &'static str {
        match err {
            QuoteError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_applies_defaults() {
        let mut raw = body();
        raw.region = None;
        let request = FeatureEncoder::new(2025).parse(&raw).unwrap();
        assert_eq!(request.region, Region::Northeast);
        assert_eq!(request.plan, Plan::Standard);
        assert!(request.addons.is_empty());
    }

    #[test]
    fn test_parse_names_offending_field() {
        let encoder = FeatureEncoder::new(2025);

        let mut raw = body();
        raw.age = Some(17);
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "age");

        let mut raw = body();
        raw.annual_mileage = Some(30_001);
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "annual_mileage");

        let mut raw = body();
        raw.vehicle_year = Some(2026);
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "vehicle_year");

        let mut raw = body();
        raw.fuel_type = Some("LPG".into());
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "fuel_type");

        let mut raw = body();
        raw.smoker = None;
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "smoker");

        let mut raw = body();
        raw.addons = Some(vec!["jetpack".into()]);
        assert_eq!(field_of(encoder.parse(&raw).unwrap_err()), "addons");
    }

    #[test]
    fn test_unknown_brand_has_dedicated_error() {
        let mut raw = body();
        raw.vehicle_make = Some("Lada".into());
        let err = FeatureEncoder::new(2025).parse(&raw).unwrap_err();
        assert_eq!(
            err,
            QuoteError::UnknownBrand {
                value: "Lada".into()
            }
        );
    }

    #[test]
    fn test_encode_derives_bands() {
        let encoder = FeatureEncoder::new(2025);
        let request = encoder.parse(&body()).unwrap();
        let features = encoder.encode(&request).unwrap();

        assert_eq!(features.age_group(), AgeGroup::Young);
        assert_eq!(features.vehicle_age(), 5);
        assert_eq!(features.vehicle_age_band(), VehicleAgeBand::Recent);
        assert_eq!(features.mileage_band(), MileageBand::From15k);
        assert_eq!(features.brand_tier(), BrandTier::Economy);
        assert_eq!(features.values().len(), FEATURE_COUNT);
        assert_eq!(features.values()[SMOKER_FEATURE], 0.0);
    }

    #[test]
    fn test_encode_rejects_out_of_range_typed_request() {
        let encoder = FeatureEncoder::new(2025);
        let mut request = encoder.parse(&body()).unwrap();
        request.age = 81;
        assert_eq!(field_of(encoder.encode(&request).unwrap_err()), "age");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let encoder = FeatureEncoder::new(2025);
        let request = encoder.parse(&body()).unwrap();
        assert_eq!(
            encoder.encode(&request).unwrap(),
            encoder.encode(&request).unwrap()
        );
    }

    #[test]
    fn test_savings_profile_accepts_partial_body() {
        let body = SavingsTipsRequest {
            vehicle_make: Some("bmw".into()),
            smoker: Some("yes".into()),
            ..SavingsTipsRequest::default()
        };
        let profile = parse_savings_profile(&body).unwrap();
        assert_eq!(profile.vehicle_make, Some(Brand::Bmw));
        assert_eq!(profile.smoker, Some(true));
        assert_eq!(profile.fuel_type, None);

        let body = SavingsTipsRequest {
            fuel_type: Some("coal".into()),
            ..SavingsTipsRequest::default()
        };
        assert_eq!(field_of(parse_savings_profile(&body).unwrap_err()), "fuel_type");
    }

    #[test]
    fn test_feature_names_match_vector_length() {
        assert_eq!(FEATURE_NAMES.len(), FEATURE_COUNT);
        assert_eq!(FEATURE_NAMES[SMOKER_FEATURE], "smoker");
    }
}
