//! Historical reference population loaded once at startup.

use crate::catalog::{AgeGroup, Brand, ClosedSet, FuelType, Region, Sex, UsageType};
use crate::encoder::{
    EncodedFeatures, RiskProfile, MAX_AGE, MAX_ANNUAL_MILEAGE, MIN_AGE, MIN_ANNUAL_MILEAGE,
    MIN_VEHICLE_YEAR,
};
use crate::money::Money;
use rust_decimal::Decimal;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to open reference dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed reference dataset: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid reference record at row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// CSV row as stored on disk.
#[derive(Debug, Deserialize)]
struct CsvRow {
    age: u32,
    sex: Sex,
    smoker: String,
    region: Region,
    vehicle_make: Brand,
    vehicle_year: i32,
    vehicle_age: u32,
    annual_mileage: u32,
    usage_type: UsageType,
    fuel_type: FuelType,
    monthly_premium: String,
}

/// One historical policy: the rated attributes and the premium that was observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceRecord {
    pub profile: RiskProfile,
    pub vehicle_year: i32,
    pub monthly_premium: Money,
}

impl ReferenceRecord {
    pub fn age_group(&self) -> AgeGroup {
        AgeGroup::from_age(self.profile.age)
    }

    pub fn encode(&self) -> EncodedFeatures {
        EncodedFeatures::from_profile(self.profile)
    }

    /// Year the record was observed: vehicle year plus vehicle age.
    pub fn survey_year(&self) -> i64 {
        i64::from(self.vehicle_year) + i64::from(self.profile.vehicle_age)
    }

    fn canonical_line(&self) -> String {
        let p = &self.profile;
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}\n",
            p.age,
            p.sex,
            if p.smoker { "yes" } else { "no" },
            p.region,
            p.brand,
            self.vehicle_year,
            p.vehicle_age,
            p.annual_mileage,
            p.usage_type,
            p.fuel_type,
            self.monthly_premium.amount().normalize()
        )
    }
}

impl TryFrom<(usize, CsvRow)> for ReferenceRecord {
    type Error = DatasetError;

    fn try_from((row, raw): (usize, CsvRow)) -> Result<Self, Self::Error> {
        let invalid = |message: String| DatasetError::InvalidRow { row, message };

        let smoker = match raw.smoker.trim().to_ascii_lowercase().as_str() {
            "yes" => true,
            "no" => false,
            other => return Err(invalid(format!("smoker must be yes or no, got '{}'", other))),
        };
        if !(MIN_AGE..=MAX_AGE).contains(&raw.age) {
            return Err(invalid(format!(
                "age must be between {} and {}, got {}",
                MIN_AGE, MAX_AGE, raw.age
            )));
        }
        if !(MIN_ANNUAL_MILEAGE..=MAX_ANNUAL_MILEAGE).contains(&raw.annual_mileage) {
            return Err(invalid(format!(
                "annual_mileage must be between {} and {}, got {}",
                MIN_ANNUAL_MILEAGE, MAX_ANNUAL_MILEAGE, raw.annual_mileage
            )));
        }
        if raw.vehicle_year < MIN_VEHICLE_YEAR {
            return Err(invalid(format!(
                "vehicle_year must not be earlier than {}, got {}",
                MIN_VEHICLE_YEAR, raw.vehicle_year
            )));
        }
        let monthly_premium = match raw.monthly_premium.parse::<Decimal>() {
            Ok(amount) if amount > Decimal::ZERO => Money::new(amount),
            _ => {
                return Err(invalid(format!(
                    "monthly_premium must be a positive amount, got '{}'",
                    raw.monthly_premium
                )))
            }
        };

        Ok(Self {
            profile: RiskProfile {
                age: raw.age,
                sex: raw.sex,
                smoker,
                region: raw.region,
                brand: raw.vehicle_make,
                vehicle_age: raw.vehicle_age,
                annual_mileage: raw.annual_mileage,
                usage_type: raw.usage_type,
                fuel_type: raw.fuel_type,
            },
            vehicle_year: raw.vehicle_year,
            monthly_premium,
        })
    }
}

/// Immutable reference population plus a content fingerprint.
#[derive(Debug, Clone)]
pub struct ReferenceDataset {
    records: Vec<ReferenceRecord>,
    fingerprint: String,
}

impl ReferenceDataset {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let dataset = Self::from_reader(file)?;
        tracing::info!(
            "Loaded {} reference records from {} (sha256 {})",
            dataset.len(),
            path.display(),
            &dataset.fingerprint[..12]
        );
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut records: Vec<ReferenceRecord> = Vec::new();
        for (index, row_result) in csv_reader.deserialize::<CsvRow>().enumerate() {
            // Row 1 is the header.
            let row = index + 2;
            let record = ReferenceRecord::try_from((row, row_result?))?;
            // vehicle_age is only meaningful against a single survey year
            if let Some(first) = records.first() {
                if record.survey_year() != first.survey_year() {
                    return Err(DatasetError::InvalidRow {
                        row,
                        message: format!(
                            "vehicle_year {} plus vehicle_age {} gives survey year {}, expected {}",
                            record.vehicle_year,
                            record.profile.vehicle_age,
                            record.survey_year(),
                            first.survey_year()
                        ),
                    });
                }
            }
            records.push(record);
        }
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ReferenceRecord>) -> Self {
        let mut hasher = Sha256::new();
        for record in &records {
            hasher.update(record.canonical_line().as_bytes());
        }
        Self {
            fingerprint: hex::encode(hasher.finalize()),
            records,
        }
    }

    pub fn records(&self) -> &[ReferenceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Hex sha256 over the canonical form of every record.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Brands that appear at least once, in label order.
    pub fn brands_present(&self) -> Vec<Brand> {
        let mut brands: Vec<Brand> = Brand::ALL
            .iter()
            .copied()
            .filter(|brand| self.records.iter().any(|r| r.profile.brand == *brand))
            .collect();
        brands.sort_by_key(|brand| brand.label());
        brands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
age,sex,smoker,region,vehicle_make,vehicle_year,vehicle_age,annual_mileage,usage_type,fuel_type,monthly_premium
25,male,no,northeast,Maruti,2020,5,15000,Personal,Petrol,1050.50
61,female,yes,southwest,BMW,2023,2,24000,Ride-share,Diesel,2875.25
";

    #[test]
    fn test_parses_typed_records() {
        let dataset = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.len(), 2);

        let second = &dataset.records()[1];
        assert_eq!(second.profile.brand, Brand::Bmw);
        assert!(second.profile.smoker);
        assert_eq!(second.profile.usage_type, UsageType::RideShare);
        assert_eq!(second.monthly_premium, Money::from_paise(287_525));
        assert_eq!(second.age_group(), AgeGroup::Senior);
    }

    #[test]
    fn test_invalid_row_reports_line_number() {
        let bad = SAMPLE.replace("61,female,yes", "61,female,sometimes");
        match ReferenceDataset::from_reader(bad.as_bytes()).unwrap_err() {
            DatasetError::InvalidRow { row, .. } => assert_eq!(row, 3),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    fn row_error(csv: &str) -> (usize, String) {
        match ReferenceDataset::from_reader(csv.as_bytes()).unwrap_err() {
            DatasetError::InvalidRow { row, message } => (row, message),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        let (row, message) = row_error(&SAMPLE.replace("61,female", "17,female"));
        assert_eq!(row, 3);
        assert!(message.starts_with("age must be between 18 and 80"));

        let (_, message) = row_error(&SAMPLE.replace("61,female", "81,female"));
        assert!(message.contains("got 81"));

        let (row, message) = row_error(&SAMPLE.replace(",15000,", ",4999,"));
        assert_eq!(row, 2);
        assert!(message.starts_with("annual_mileage"));

        let (_, message) = row_error(&SAMPLE.replace(",24000,", ",30001,"));
        assert!(message.starts_with("annual_mileage"));
    }

    #[test]
    fn test_rejects_vehicle_year_before_floor() {
        let (row, message) = row_error(&SAMPLE.replace("Maruti,2020,5", "Maruti,1979,46"));
        assert_eq!(row, 2);
        assert!(message.starts_with("vehicle_year must not be earlier than 1980"));
    }

    #[test]
    fn test_rejects_inconsistent_vehicle_age() {
        // 2023 + 7 disagrees with the first row's 2020 + 5
        let (row, message) = row_error(&SAMPLE.replace("BMW,2023,2", "BMW,2023,7"));
        assert_eq!(row, 3);
        assert!(message.contains("expected 2025"));
    }

    #[test]
    fn test_rejects_malformed_premium() {
        let (_, message) = row_error(&SAMPLE.replace("1050.50", "n/a"));
        assert!(message.starts_with("monthly_premium"));
        let (_, message) = row_error(&SAMPLE.replace("1050.50", "-3"));
        assert!(message.contains("'-3'"));
    }

    #[test]
    fn test_unknown_brand_is_a_csv_error() {
        let bad = SAMPLE.replace("Maruti", "Lada");
        assert!(matches!(
            ReferenceDataset::from_reader(bad.as_bytes()),
            Err(DatasetError::Csv(_))
        ));
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let a = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let b = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        let c = ReferenceDataset::from_reader(SAMPLE.replace("1050.50", "1050.51").as_bytes())
            .unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_brands_present_sorted_by_label() {
        let dataset = ReferenceDataset::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dataset.brands_present(), vec![Brand::Bmw, Brand::Maruti]);
    }

    #[test]
    fn test_shipped_dataset_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/reference_population.csv");
        let dataset = ReferenceDataset::load(path).unwrap();
        assert_eq!(dataset.len(), 1338);
        assert!(dataset.records().iter().all(|r| r.survey_year() == 2025));
    }
}
