//! Descriptive statistics over the reference population, one section per dimension.
//!
//! Sections are computed on first access and cached for the life of the process. The
//! cache coalesces concurrent first requests for a dimension into a single computation.

use crate::catalog::{
    AgeGroup, Brand, BrandTier, ClosedSet, FuelType, MileageBand, Region, Sex, UsageType,
    VehicleAgeBand,
};
use crate::money::Money;
use crate::reference_data::{ReferenceDataset, ReferenceRecord};
use crate::savings::{SavingsContrasts, SavingsTip};
use moka::future::Cache;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Analytics dimensions, labelled by their section name in the insights payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Dimension {
    Brand,
    AgeGroup,
    Smoking,
    Mileage,
    VehicleAge,
    Fuel,
    Region,
    Gender,
    Usage,
    SavingsTips,
    Popularity,
    PremiumRange,
}

impl Dimension {
    pub const ALL: [Dimension; 12] = [
        Dimension::Brand,
        Dimension::AgeGroup,
        Dimension::Smoking,
        Dimension::Mileage,
        Dimension::VehicleAge,
        Dimension::Fuel,
        Dimension::Region,
        Dimension::Gender,
        Dimension::Usage,
        Dimension::SavingsTips,
        Dimension::Popularity,
        Dimension::PremiumRange,
    ];

    pub fn section(self) -> &'static str {
        match self {
            Dimension::Brand => "brand_comparison",
            Dimension::AgeGroup => "age_vs_premium",
            Dimension::Smoking => "smoking_impact",
            Dimension::Mileage => "mileage_impact",
            Dimension::VehicleAge => "vehicle_age_impact",
            Dimension::Fuel => "fuel_type_comparison",
            Dimension::Region => "region_comparison",
            Dimension::Gender => "gender_comparison",
            Dimension::Usage => "usage_type_comparison",
            Dimension::SavingsTips => "savings_calculator",
            Dimension::Popularity => "most_popular",
            Dimension::PremiumRange => "premium_distribution",
        }
    }

    pub fn from_section(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.section() == name)
    }

    /// Key under which each data entry carries its group label.
    fn group_key(self) -> &'static str {
        match self {
            Dimension::Brand => "brand",
            Dimension::AgeGroup => "ageGroup",
            Dimension::Smoking => "type",
            Dimension::Mileage | Dimension::VehicleAge | Dimension::PremiumRange => "range",
            Dimension::Fuel => "fuel",
            Dimension::Region => "region",
            Dimension::Gender => "gender",
            Dimension::Usage => "usage",
            Dimension::SavingsTips | Dimension::Popularity => "key",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.section())
    }
}

// ============ Section payloads ============

/// Aggregate premium statistics for one group.
#[derive(Debug, Clone, PartialEq)]
pub struct InsightBucket {
    pub key: String,
    pub avg_premium: Money,
    pub count: usize,
    /// Share of the population in this group, one decimal.
    pub percentage: f64,
    pub min_premium: Money,
    pub max_premium: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BucketTable {
    pub dimension: Dimension,
    pub title: &'static str,
    pub buckets: Vec<InsightBucket>,
    pub insight: String,
}

impl BucketTable {
    pub fn bucket(&self, key: &str) -> Option<&InsightBucket> {
        self.buckets.iter().find(|b| b.key == key)
    }
}

struct KeyedBucket<'a>(&'static str, &'a InsightBucket);

impl Serialize for KeyedBucket<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let KeyedBucket(key, bucket) = self;
        let mut map = serializer.serialize_map(Some(6))?;
        map.serialize_entry(key, &bucket.key)?;
        map.serialize_entry("avgPremium", &bucket.avg_premium)?;
        map.serialize_entry("count", &bucket.count)?;
        map.serialize_entry("percentage", &bucket.percentage)?;
        map.serialize_entry("minPremium", &bucket.min_premium)?;
        map.serialize_entry("maxPremium", &bucket.max_premium)?;
        map.end()
    }
}

struct KeyedBuckets<'a>(&'static str, &'a [InsightBucket]);

impl Serialize for KeyedBuckets<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.1.len()))?;
        for bucket in self.1 {
            seq.serialize_element(&KeyedBucket(self.0, bucket))?;
        }
        seq.end()
    }
}

impl Serialize for BucketTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("title", self.title)?;
        map.serialize_entry(
            "data",
            &KeyedBuckets(self.dimension.group_key(), &self.buckets),
        )?;
        map.serialize_entry("insight", &self.insight)?;
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TipsTable {
    pub title: &'static str,
    pub tips: Vec<SavingsTip>,
    #[serde(skip)]
    pub contrasts: SavingsContrasts,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopularChoices {
    pub top_brands: Vec<String>,
    pub avg_age: f64,
    pub preferred_usage: String,
    pub preferred_fuel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularTable {
    pub title: &'static str,
    pub data: PopularChoices,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumRange {
    pub range: &'static str,
    pub percentage: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionTable {
    pub title: &'static str,
    pub ranges: Vec<PremiumRange>,
    pub insight: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum InsightTable {
    Buckets(BucketTable),
    Tips(TipsTable),
    Popular(PopularTable),
    Distribution(DistributionTable),
}

impl InsightTable {
    pub fn as_buckets(&self) -> Option<&BucketTable> {
        match self {
            InsightTable::Buckets(table) => Some(table),
            _ => None,
        }
    }

    pub fn as_tips(&self) -> Option<&TipsTable> {
        match self {
            InsightTable::Tips(table) => Some(table),
            _ => None,
        }
    }
}

/// All sections in dimension order.
#[derive(Debug, Clone)]
pub struct InsightsReport {
    pub sections: Vec<(Dimension, Arc<InsightTable>)>,
}

impl Serialize for InsightsReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (dimension, table) in &self.sections {
            map.serialize_entry(dimension.section(), table.as_ref())?;
        }
        map.end()
    }
}

// ============ Aggregator ============

#[derive(Clone)]
pub struct InsightsAggregator {
    dataset: Arc<ReferenceDataset>,
    cache: Cache<Dimension, Arc<InsightTable>>,
    computations: Arc<AtomicUsize>,
}

impl InsightsAggregator {
    pub fn new(dataset: Arc<ReferenceDataset>) -> Self {
        Self {
            dataset,
            cache: Cache::builder().max_capacity(64).build(),
            computations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn dataset(&self) -> &ReferenceDataset {
        &self.dataset
    }

    /// The section for `dimension`, computing it on first access.
    pub async fn aggregate(&self, dimension: Dimension) -> Arc<InsightTable> {
        let dataset = Arc::clone(&self.dataset);
        let computations = Arc::clone(&self.computations);
        self.cache
            .get_with(dimension, async move {
                computations.fetch_add(1, Ordering::SeqCst);
                tracing::debug!("Computing insights section {}", dimension);
                Arc::new(compute(&dataset, dimension))
            })
            .await
    }

    pub async fn report(&self) -> InsightsReport {
        let mut sections = Vec::with_capacity(Dimension::ALL.len());
        for dimension in Dimension::ALL {
            sections.push((dimension, self.aggregate(dimension).await));
        }
        InsightsReport { sections }
    }

    /// Number of section computations performed so far.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }
}

fn compute(dataset: &ReferenceDataset, dimension: Dimension) -> InsightTable {
    let records = dataset.records();
    match dimension {
        Dimension::Brand => {
            let mut brands: Vec<Brand> = Brand::ALL.to_vec();
            brands.sort_by_key(|b| b.label());
            let buckets = group(records, &brands, |r| r.profile.brand, |b| b.to_string());
            let insight = brand_insight(records);
            table(dimension, "Average Premium by Vehicle Brand", buckets, insight)
        }
        Dimension::AgeGroup => {
            let buckets = group(records, AgeGroup::ALL, |r| r.age_group(), |g| g.to_string());
            let insight = match (buckets.first(), buckets.last()) {
                (Some(first), Some(last)) if buckets.len() > 1 => format!(
                    "{} drivers pay {} than {} drivers",
                    last.key,
                    relative_percent(last.avg_premium, first.avg_premium),
                    first.key
                ),
                _ => "Not enough data to compare age groups".to_string(),
            };
            table(dimension, "Insurance Cost by Age Group", buckets, insight)
        }
        Dimension::Smoking => {
            let buckets = group(
                records,
                &[false, true],
                |r| r.profile.smoker,
                |smoker| if smoker { "Smoker" } else { "Non-Smoker" }.to_string(),
            );
            let smoker = buckets.iter().find(|b| b.key == "Smoker");
            let non_smoker = buckets.iter().find(|b| b.key == "Non-Smoker");
            let insight = match (smoker, non_smoker) {
                (Some(smoker), Some(non)) => format!(
                    "Smokers pay {}/month more ({} premium)",
                    smoker.avg_premium - non.avg_premium,
                    relative_percent_word(smoker.avg_premium, non.avg_premium, "higher", "lower")
                ),
                _ => "Not enough data to compare smokers and non-smokers".to_string(),
            };
            table(
                dimension,
                "Smoker vs Non-Smoker Premium Comparison",
                buckets,
                insight,
            )
        }
        Dimension::Mileage => {
            let buckets = group(
                records,
                MileageBand::ALL,
                |r| MileageBand::from_mileage(r.profile.annual_mileage),
                |b| b.to_string(),
            );
            let insight = spread_insight(&buckets, "mileage band");
            table(dimension, "Premium by Annual Mileage", buckets, insight)
        }
        Dimension::VehicleAge => {
            let buckets = group(
                records,
                VehicleAgeBand::ALL,
                |r| VehicleAgeBand::from_vehicle_age(r.profile.vehicle_age),
                |b| b.to_string(),
            );
            let insight = spread_insight(&buckets, "vehicle age band");
            table(dimension, "Premium by Vehicle Age", buckets, insight)
        }
        Dimension::Fuel => {
            let buckets = group(records, FuelType::ALL, |r| r.profile.fuel_type, |f| f.to_string());
            let insight = match (
                buckets.iter().find(|b| b.key == FuelType::Electric.label()),
                buckets.iter().find(|b| b.key == FuelType::Petrol.label()),
            ) {
                (Some(electric), Some(petrol)) => format!(
                    "Electric vehicles pay {} than petrol vehicles",
                    relative_amount(electric.avg_premium, petrol.avg_premium)
                ),
                _ => spread_insight(&buckets, "fuel type"),
            };
            table(dimension, "Premium by Fuel Type", buckets, insight)
        }
        Dimension::Region => {
            let buckets = group(records, Region::ALL, |r| r.profile.region, |g| g.to_string());
            let insight = spread_insight(&buckets, "region");
            table(dimension, "Insurance Cost by Region", buckets, insight)
        }
        Dimension::Gender => {
            let buckets = group(
                records,
                Sex::ALL,
                |r| r.profile.sex,
                |sex| match sex {
                    Sex::Male => "Male".to_string(),
                    Sex::Female => "Female".to_string(),
                },
            );
            let male = buckets.iter().find(|b| b.key == "Male");
            let female = buckets.iter().find(|b| b.key == "Female");
            let insight = match (male, female) {
                (Some(male), Some(female)) => format!(
                    "Male drivers pay {} than female drivers",
                    relative_amount(male.avg_premium, female.avg_premium)
                ),
                _ => "Not enough data to compare genders".to_string(),
            };
            table(dimension, "Average Premium by Gender", buckets, insight)
        }
        Dimension::Usage => {
            let buckets = group(
                records,
                UsageType::ALL,
                |r| r.profile.usage_type,
                |u| u.to_string(),
            );
            let business = mean(
                records
                    .iter()
                    .filter(|r| r.profile.usage_type != UsageType::Personal),
            );
            let personal = mean(
                records
                    .iter()
                    .filter(|r| r.profile.usage_type == UsageType::Personal),
            );
            let insight = match (business, personal) {
                (Some(business), Some(personal)) => format!(
                    "Commercial and ride-share vehicles cost {} than personal use",
                    relative_percent(business, personal)
                ),
                _ => spread_insight(&buckets, "usage type"),
            };
            table(dimension, "Premium by Vehicle Usage", buckets, insight)
        }
        Dimension::SavingsTips => {
            let contrasts = SavingsContrasts::from_dataset(dataset);
            InsightTable::Tips(TipsTable {
                title: "Ways to Reduce Your Premium",
                tips: contrasts.general_tips(),
                contrasts,
            })
        }
        Dimension::Popularity => InsightTable::Popular(PopularTable {
            title: "Most Popular Choices",
            data: popular_choices(records),
        }),
        Dimension::PremiumRange => distribution(records),
    }
}

fn table(
    dimension: Dimension,
    title: &'static str,
    buckets: Vec<InsightBucket>,
    insight: String,
) -> InsightTable {
    InsightTable::Buckets(BucketTable {
        dimension,
        title,
        buckets,
        insight,
    })
}

/// Groups records by `key_of`, emitting non-empty groups in `order`.
fn group<K: PartialEq + Copy>(
    records: &[ReferenceRecord],
    order: &[K],
    key_of: impl Fn(&ReferenceRecord) -> K,
    label: impl Fn(K) -> String,
) -> Vec<InsightBucket> {
    let total = records.len();
    order
        .iter()
        .filter_map(|key| {
            let premiums: Vec<Money> = records
                .iter()
                .filter(|r| key_of(*r) == *key)
                .map(|r| r.monthly_premium)
                .collect();
            let min_premium = *premiums.iter().min()?;
            let max_premium = *premiums.iter().max()?;
            Some(InsightBucket {
                key: label(*key),
                avg_premium: Money::mean(premiums.iter().copied())?,
                count: premiums.len(),
                percentage: round1(100.0 * premiums.len() as f64 / total as f64),
                min_premium,
                max_premium,
            })
        })
        .collect()
}

fn mean<'a>(records: impl Iterator<Item = &'a ReferenceRecord>) -> Option<Money> {
    Money::mean(records.map(|r| r.monthly_premium))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// "35% more" / "12% less".
fn relative_percent(value: Money, reference: Money) -> String {
    relative_percent_word(value, reference, "more", "less")
}

fn relative_percent_word(value: Money, reference: Money, up: &str, down: &str) -> String {
    let Some(ratio) = value.ratio_to(reference) else {
        return format!("{} {}", value, up);
    };
    let pct = 100.0 * (ratio - 1.0);
    if pct >= 0.0 {
        format!("{:.0}% {}", pct, up)
    } else {
        format!("{:.0}% {}", -pct, down)
    }
}

/// "₹120/month more" / "₹80/month less".
fn relative_amount(value: Money, reference: Money) -> String {
    let diff = value - reference;
    if diff.is_negative() {
        format!("{}/month less", diff.abs())
    } else {
        format!("{}/month more", diff)
    }
}

fn spread_insight(buckets: &[InsightBucket], what: &str) -> String {
    let cheapest = buckets.iter().min_by_key(|b| b.avg_premium);
    let dearest = buckets.iter().max_by_key(|b| b.avg_premium);
    match (cheapest, dearest) {
        (Some(low), Some(high)) if buckets.len() > 1 => format!(
            "Average premiums vary by up to {}/month by {}: {} is the most expensive, {} the cheapest",
            high.avg_premium - low.avg_premium,
            what,
            high.key,
            low.key
        ),
        _ => format!("Not enough data to compare by {}", what),
    }
}

fn brand_insight(records: &[ReferenceRecord]) -> String {
    let tier_mean =
        |tier: BrandTier| mean(records.iter().filter(|r| r.profile.brand.tier() == tier));
    let names = |tier: BrandTier| {
        tier.brands()
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let ratio = tier_mean(BrandTier::Luxury)
        .zip(tier_mean(BrandTier::Economy))
        .filter(|(_, economy)| economy.is_positive())
        .and_then(|(luxury, economy)| luxury.ratio_to(economy));
    match ratio {
        Some(ratio) => format!(
            "Luxury vehicles ({}) cost {:.1}x as much to insure as economy vehicles ({})",
            names(BrandTier::Luxury),
            ratio,
            names(BrandTier::Economy)
        ),
        None => "Not enough data to compare vehicle tiers".to_string(),
    }
}

fn popular_choices(records: &[ReferenceRecord]) -> PopularChoices {
    let total = records.len().max(1) as f64;
    let count_of =
        |pred: &dyn Fn(&ReferenceRecord) -> bool| records.iter().filter(|r| pred(*r)).count();

    let mut brand_counts: Vec<(Brand, usize)> = Brand::ALL
        .iter()
        .map(|brand| (*brand, count_of(&|r| r.profile.brand == *brand)))
        .filter(|(_, count)| *count > 0)
        .collect();
    brand_counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));

    let top = |counts: Vec<(String, usize)>| {
        counts
            .into_iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
            .map(|(label, count)| format!("{} ({:.0}%)", label, 100.0 * count as f64 / total))
            .unwrap_or_default()
    };
    let usage: Vec<(String, usize)> = UsageType::ALL
        .iter()
        .map(|u| (u.to_string(), count_of(&|r| r.profile.usage_type == *u)))
        .collect();
    let fuel: Vec<(String, usize)> = FuelType::ALL
        .iter()
        .map(|f| (f.to_string(), count_of(&|r| r.profile.fuel_type == *f)))
        .collect();

    let age_sum: u64 = records.iter().map(|r| u64::from(r.profile.age)).sum();

    PopularChoices {
        top_brands: brand_counts
            .iter()
            .take(3)
            .map(|(brand, count)| format!("{} ({})", brand, count))
            .collect(),
        avg_age: if records.is_empty() {
            0.0
        } else {
            round1(age_sum as f64 / records.len() as f64)
        },
        preferred_usage: top(usage),
        preferred_fuel: top(fuel),
    }
}

/// Inclusive upper bound in whole rupees, label, tier name.
const PREMIUM_RANGES: [(Option<i64>, &str, &str); 4] = [
    (Some(1_000), "Under ₹1,000", "Budget"),
    (Some(1_500), "₹1,000-₹1,500", "Standard"),
    (Some(2_500), "₹1,500-₹2,500", "Premium"),
    (None, "₹2,500+", "Luxury"),
];

fn distribution(records: &[ReferenceRecord]) -> InsightTable {
    let mut counts = [0usize; PREMIUM_RANGES.len()];
    for record in records {
        let slot = PREMIUM_RANGES
            .iter()
            .position(|(upper, _, _)| {
                upper.map_or(true, |rupees| {
                    record.monthly_premium <= Money::from_paise(rupees * 100)
                })
            })
            .unwrap_or(PREMIUM_RANGES.len() - 1);
        counts[slot] += 1;
    }

    let total = records.len();
    let ranges: Vec<PremiumRange> = PREMIUM_RANGES
        .iter()
        .zip(counts)
        .map(|((_, range, label), count)| PremiumRange {
            range,
            percentage: if total == 0 {
                0.0
            } else {
                round1(100.0 * count as f64 / total as f64)
            },
            label,
        })
        .collect();

    let insight = ranges
        .iter()
        .max_by(|a, b| a.percentage.total_cmp(&b.percentage))
        .filter(|_| total > 0)
        .map(|top| format!("{:.0}% of customers pay {}/month", top.percentage, top.range))
        .unwrap_or_else(|| "No premiums recorded".to_string());

    InsightTable::Distribution(DistributionTable {
        title: "Premium Distribution",
        ranges,
        insight,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::RiskProfile;

    fn record(
        brand: Brand,
        age: u32,
        smoker: bool,
        usage: UsageType,
        premium: &str,
    ) -> ReferenceRecord {
        ReferenceRecord {
            profile: RiskProfile {
                age,
                sex: if age % 2 == 0 { Sex::Male } else { Sex::Female },
                smoker,
                region: Region::Northeast,
                brand,
                vehicle_age: 3,
                annual_mileage: 11_000,
                usage_type: usage,
                fuel_type: FuelType::Petrol,
            },
            vehicle_year: 2022,
            monthly_premium: Money::new(premium.parse().unwrap()),
        }
    }

    fn aggregator() -> InsightsAggregator {
        InsightsAggregator::new(Arc::new(ReferenceDataset::from_records(vec![
            record(Brand::Tata, 22, false, UsageType::Personal, "900"),
            record(Brand::Audi, 30, true, UsageType::Personal, "2900"),
            record(Brand::Maruti, 45, false, UsageType::Commercial, "1300"),
            record(Brand::Audi, 60, false, UsageType::RideShare, "2100"),
        ])))
    }

    #[tokio::test]
    async fn test_brand_buckets_in_alphabetical_order() {
        let table = aggregator().aggregate(Dimension::Brand).await;
        let buckets = &table.as_buckets().unwrap().buckets;
        let keys: Vec<_> = buckets.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["Audi", "Maruti", "Tata"]);
        assert_eq!(buckets[0].avg_premium, Money::from_paise(250_000));
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].percentage, 50.0);
        assert_eq!(buckets[0].min_premium, Money::from_paise(210_000));
    }

    #[tokio::test]
    async fn test_age_groups_follow_band_order() {
        let table = aggregator().aggregate(Dimension::AgeGroup).await;
        let keys: Vec<_> = table
            .as_buckets()
            .unwrap()
            .buckets
            .iter()
            .map(|b| b.key.clone())
            .collect();
        assert_eq!(
            keys,
            vec!["Young (18-25)", "Adult (26-40)", "Middle (41-55)", "Senior (56+)"]
        );
    }

    #[tokio::test]
    async fn test_smoking_percentages_sum_to_hundred() {
        let table = aggregator().aggregate(Dimension::Smoking).await;
        let buckets = &table.as_buckets().unwrap().buckets;
        let total: f64 = buckets.iter().map(|b| b.percentage).sum();
        assert!((total - 100.0).abs() <= 1.0);
        assert_eq!(buckets[0].key, "Non-Smoker");
    }

    #[tokio::test]
    async fn test_each_dimension_computed_once() {
        let aggregator = aggregator();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let aggregator = aggregator.clone();
            handles.push(tokio::spawn(async move {
                aggregator.aggregate(Dimension::Region).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        aggregator.report().await;
        aggregator.report().await;
        assert_eq!(aggregator.computations(), Dimension::ALL.len());
    }

    #[tokio::test]
    async fn test_report_serializes_wire_keys() {
        let report = aggregator().report().await;
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["brand_comparison"]["data"][0]["brand"], "Audi");
        assert_eq!(json["age_vs_premium"]["data"][0]["ageGroup"], "Young (18-25)");
        assert_eq!(json["smoking_impact"]["data"][1]["type"], "Smoker");
        assert!(json["mileage_impact"]["data"][0]["range"].is_string());
        assert_eq!(json["fuel_type_comparison"]["data"][0]["fuel"], "Petrol");
        assert_eq!(json["region_comparison"]["data"][0]["region"], "northeast");
        assert_eq!(json["usage_type_comparison"]["data"][0]["usage"], "Personal");
        assert!(json["savings_calculator"]["tips"].is_array());
        assert!(json["savings_calculator"]["title"].is_string());
        assert!(json["most_popular"]["data"]["topBrands"].is_array());
        assert_eq!(json["premium_distribution"]["ranges"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_empty_dataset_yields_empty_sections() {
        let empty = ReferenceDataset::from_records(Vec::new());
        let aggregator = InsightsAggregator::new(Arc::new(empty));
        let table = aggregator.aggregate(Dimension::Fuel).await;
        assert!(table.as_buckets().unwrap().buckets.is_empty());
        let distribution = aggregator.aggregate(Dimension::PremiumRange).await;
        assert!(matches!(distribution.as_ref(), InsightTable::Distribution(_)));
    }

    #[test]
    fn test_section_names_round_trip() {
        for dimension in Dimension::ALL {
            assert_eq!(Dimension::from_section(dimension.section()), Some(dimension));
        }
        assert_eq!(Dimension::from_section("weather"), None);
    }

    #[test]
    fn test_distribution_upper_bounds_inclusive() {
        let records = vec![
            record(Brand::Tata, 22, false, UsageType::Personal, "1000"),
            record(Brand::Tata, 22, false, UsageType::Personal, "1000.01"),
        ];
        match distribution(&records) {
            InsightTable::Distribution(table) => {
                assert_eq!(table.ranges[0].percentage, 50.0);
                assert_eq!(table.ranges[1].percentage, 50.0);
            }
            other => panic!("unexpected table {:?}", other),
        }
    }
}
