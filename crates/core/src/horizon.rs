use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::month::YearMonth;

/// Current year plus three more.
pub const DEFAULT_HORIZON_YEARS: u32 = 4;
pub const MAX_HORIZON_YEARS: u32 = 10;

/// Tracked window of consecutive calendar years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    first_year: i32,
    years: u32,
}

impl Horizon {
    pub fn starting_at(first_year: i32, years: u32) -> Self {
        Self { first_year, years: years.max(1) }
    }

    pub fn first_year(&self) -> i32 {
        self.first_year
    }

    pub fn last_year(&self) -> i32 {
        self.first_year + self.years as i32 - 1
    }

    pub fn year_range(&self) -> RangeInclusive<i32> {
        self.first_year()..=self.last_year()
    }

    pub fn first_month(&self) -> YearMonth {
        YearMonth::january(self.first_year())
    }

    pub fn last_month(&self) -> YearMonth {
        YearMonth::december(self.last_year())
    }

    pub fn contains(&self, month: YearMonth) -> bool {
        self.first_month() <= month && month <= self.last_month()
    }

    pub fn clamp_month(&self, month: YearMonth) -> YearMonth {
        month.clamp(self.first_month(), self.last_month())
    }

    /// Folds out-of-window rows onto the nearest boundary month.
    ///
    /// Rows landing on the same month are summed and the output is sorted, so
    /// the total never changes and a second pass is a no-op.
    pub fn clamp<I>(&self, rows: I) -> Vec<(YearMonth, Decimal)>
    where
        I: IntoIterator<Item = (YearMonth, Decimal)>,
    {
        let mut merged: BTreeMap<YearMonth, Decimal> = BTreeMap::new();
        for (month, amount) in rows {
            *merged.entry(self.clamp_month(month)).or_insert(Decimal::ZERO) += amount;
        }
        merged.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::Horizon;
    use crate::domain::month::YearMonth;

    fn month(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    #[test]
    fn boundaries_cover_whole_years() {
        let horizon = Horizon::starting_at(2025, 4);
        assert_eq!(horizon.first_month(), month(2025, 1));
        assert_eq!(horizon.last_month(), month(2028, 12));
        assert!(horizon.contains(month(2026, 7)));
        assert!(!horizon.contains(month(2024, 12)));
        assert_eq!(horizon.year_range().count(), 4);
    }

    #[test]
    fn rows_outside_the_window_fold_onto_boundaries() {
        let horizon = Horizon::starting_at(2025, 1);
        let clamped = horizon.clamp(vec![
            (month(2024, 11), Decimal::new(100, 0)),
            (month(2024, 12), Decimal::new(100, 0)),
            (month(2025, 1), Decimal::new(100, 0)),
            (month(2025, 6), Decimal::new(50, 0)),
            (month(2026, 2), Decimal::new(25, 0)),
        ]);

        assert_eq!(
            clamped,
            vec![
                (month(2025, 1), Decimal::new(300, 0)),
                (month(2025, 6), Decimal::new(50, 0)),
                (month(2025, 12), Decimal::new(25, 0)),
            ]
        );
    }

    #[test]
    fn in_window_rows_are_untouched() {
        let horizon = Horizon::starting_at(2025, 2);
        let rows = vec![(month(2025, 3), Decimal::ONE), (month(2026, 9), Decimal::TWO)];
        assert_eq!(horizon.clamp(rows.clone()), rows);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(128))]

        #[test]
        fn clamp_preserves_total_and_is_idempotent(
            rows in prop::collection::vec((2015i32..2035, 1u32..=12, -50_000i64..500_000), 0..60),
            first_year in 2020i32..2030,
            years in 1u32..6,
        ) {
            let horizon = Horizon::starting_at(first_year, years);
            let rows: Vec<_> = rows
                .into_iter()
                .map(|(year, month_of_year, cents)| (month(year, month_of_year), Decimal::new(cents, 2)))
                .collect();
            let before: Decimal = rows.iter().map(|(_, value)| *value).sum();

            let once = horizon.clamp(rows);
            let after: Decimal = once.iter().map(|(_, value)| *value).sum();
            prop_assert_eq!(before, after);
            prop_assert!(once.iter().all(|(month, _)| horizon.contains(*month)));
            prop_assert_eq!(horizon.clamp(once.clone()), once);
        }
    }
}
