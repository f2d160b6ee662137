use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Rupee amount rounded to the paisa. Breakdown components add up exactly.
///
/// Serializes as a JSON number of rupees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Rounds to the nearest paisa, half away from zero.
    pub fn new(rupees: Decimal) -> Self {
        Money(rupees.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn from_paise(paise: i64) -> Self {
        Money(Decimal::new(paise, 2))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    pub fn abs(self) -> Self {
        Money(self.0.abs())
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn scale(self, factor: Decimal) -> Money {
        Money::new(self.0 * factor)
    }

    /// Mean rounded to the paisa, `None` for no amounts.
    pub fn mean(amounts: impl IntoIterator<Item = Money>) -> Option<Money> {
        let (total, count) = amounts
            .into_iter()
            .fold((Decimal::ZERO, 0i64), |(total, count), m| (total + m.0, count + 1));
        (count > 0).then(|| Money::new(total / Decimal::from(count)))
    }

    /// `self / other`, `None` when `other` is zero.
    pub fn ratio_to(self, other: Money) -> Option<f64> {
        self.0.checked_div(other.0).and_then(|ratio| ratio.to_f64())
    }

    /// Whole rupees, rounded, for display in messages ("₹1,250/month").
    pub fn whole_rupees(self) -> i64 {
        self.0
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or_default()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        Money(iter.map(|m| m.0).sum())
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", group_thousands(self.whole_rupees()))
    }
}

/// Formats an integer with comma thousands separators (15000 → "15,000").
pub fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rupees(value: &str) -> Money {
        Money::new(value.parse().unwrap())
    }

    #[test]
    fn test_new_rounds_half_away_from_zero() {
        assert_eq!(rupees("10.005"), Money::from_paise(1001));
        assert_eq!(rupees("10.004"), Money::from_paise(1000));
        assert_eq!(rupees("-10.005"), Money::from_paise(-1001));
        assert_eq!(rupees("1061.625"), Money::from_paise(106_163));
    }

    #[test]
    fn test_sum_and_arithmetic() {
        let total: Money = [Money::from_paise(150), Money::from_paise(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_paise(400));
        assert_eq!((total - Money::from_paise(500)).abs(), Money::from_paise(100));
    }

    #[test]
    fn test_tenths_sum_exactly() {
        let total: Money = std::iter::repeat(rupees("0.10")).take(10).sum();
        assert_eq!(total, rupees("1"));
    }

    #[test]
    fn test_mean_and_ratio() {
        let amounts = [rupees("100"), rupees("100"), rupees("101")];
        assert_eq!(Money::mean(amounts), Some(rupees("100.33")));
        assert_eq!(Money::mean(Vec::new()), None);
        assert_eq!(rupees("150").ratio_to(rupees("100")), Some(1.5));
        assert_eq!(rupees("150").ratio_to(Money::ZERO), None);
    }

    #[test]
    fn test_serializes_as_rupees() {
        let json = serde_json::to_string(&Money::from_paise(123_456)).unwrap();
        assert_eq!(json, "1234.56");
    }

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(rupees("15000.4").to_string(), "₹15,000");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(-1_234_567), "-1,234,567");
    }
}
