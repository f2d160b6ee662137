//! Percentile comparison of a quote against similar historical drivers.

use crate::catalog::AgeGroup;
use crate::encoder::QuoteRequest;
use crate::money::Money;
use crate::reference_data::{ReferenceDataset, ReferenceRecord};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_MIN_POPULATION: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparatorConfig {
    /// Smallest matched population accepted before widening the match.
    pub min_population: usize,
}

impl Default for ComparatorConfig {
    fn default() -> Self {
        Self {
            min_population: DEFAULT_MIN_POPULATION,
        }
    }
}

/// Which records the comparison was made against, narrowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchScope {
    BrandAndAgeGroup,
    Brand,
    AgeGroup,
    Population,
}

impl MatchScope {
    const WIDENING: [MatchScope; 4] = [
        MatchScope::BrandAndAgeGroup,
        MatchScope::Brand,
        MatchScope::AgeGroup,
        MatchScope::Population,
    ];

    fn matches(
        self,
        record: &ReferenceRecord,
        request: &QuoteRequest,
        age_group: AgeGroup,
    ) -> bool {
        let same_brand = record.profile.brand == request.vehicle_make;
        let same_age = record.age_group() == age_group;
        match self {
            MatchScope::BrandAndAgeGroup => same_brand && same_age,
            MatchScope::Brand => same_brand,
            MatchScope::AgeGroup => same_age,
            MatchScope::Population => true,
        }
    }
}

/// Attached when even the full population is below the minimum size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationTooSmallWarning {
    pub available: usize,
    pub required: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarProfiles {
    pub range: String,
    pub average: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub percentile: f64,
    pub message: String,
    pub similar_profiles: SimilarProfiles,
    pub matched_on: MatchScope,
    pub sample_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<PopulationTooSmallWarning>,
}

#[derive(Debug, Clone)]
pub struct Comparator {
    dataset: Arc<ReferenceDataset>,
    config: ComparatorConfig,
}

impl Comparator {
    pub fn new(dataset: Arc<ReferenceDataset>, config: ComparatorConfig) -> Self {
        Self { dataset, config }
    }

    pub fn compare(&self, request: &QuoteRequest, monthly: Money) -> ComparisonResult {
        let age_group = AgeGroup::from_age(request.age);
        let records = self.dataset.records();

        let mut scope = MatchScope::Population;
        let mut matched: Vec<Money> = Vec::new();
        for candidate in MatchScope::WIDENING {
            matched = records
                .iter()
                .filter(|record| candidate.matches(record, request, age_group))
                .map(|record| record.monthly_premium)
                .collect();
            scope = candidate;
            if matched.len() >= self.config.min_population {
                break;
            }
        }

        let warning = (matched.len() < self.config.min_population).then(|| {
            tracing::warn!(
                "Comparison population too small: {} records, {} required",
                matched.len(),
                self.config.min_population
            );
            PopulationTooSmallWarning {
                available: matched.len(),
                required: self.config.min_population,
                message: format!(
                    "Only {} reference records available; comparison may be unreliable",
                    matched.len()
                ),
            }
        });

        let percentile = percentile_of(&matched, monthly);
        let similar_profiles = similar_profiles(&matched, monthly);

        ComparisonResult {
            percentile,
            message: percentile_message(percentile),
            similar_profiles,
            matched_on: scope,
            sample_size: matched.len(),
            warning,
        }
    }
}

/// Share of premiums at or below `monthly`, in percent with one decimal.
pub fn percentile_of(premiums: &[Money], monthly: Money) -> f64 {
    if premiums.is_empty() {
        return 50.0;
    }
    let at_or_below = premiums.iter().filter(|p| **p <= monthly).count();
    let raw = 100.0 * at_or_below as f64 / premiums.len() as f64;
    (raw * 10.0).round() / 10.0
}

pub fn percentile_message(percentile: f64) -> String {
    let cheaper_than = 100.0 - percentile;
    if percentile <= 25.0 {
        format!(
            "Great news! You pay less than {:.0}% of similar drivers.",
            cheaper_than
        )
    } else if percentile <= 50.0 {
        format!("You pay less than {:.0}% of similar drivers.", cheaper_than)
    } else if percentile <= 75.0 {
        format!("You pay more than {:.0}% of similar drivers.", percentile)
    } else {
        format!(
            "You pay more than {:.0}% of similar drivers. Check our savings tips to lower your premium.",
            percentile
        )
    }
}

fn similar_profiles(matched: &[Money], monthly: Money) -> SimilarProfiles {
    let stats = matched
        .iter()
        .min()
        .zip(matched.iter().max())
        .zip(Money::mean(matched.iter().copied()));
    let (min, max, average) = match stats {
        Some(((min, max), average)) => (*min, *max, average),
        None => (
            monthly.scale(Decimal::new(9, 1)),
            monthly.scale(Decimal::new(11, 1)),
            monthly,
        ),
    };
    SimilarProfiles {
        range: format!("{}-{}/month", min, max),
        average,
    }
}
