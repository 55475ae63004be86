use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::dates::ResolvedDates;
use crate::domain::month::{shift_months, YearMonth};
use crate::domain::proposal::{Category, ProposalId};

/// One month of one proposal's spread.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAllocation {
    pub proposal_id: ProposalId,
    pub month: YearMonth,
    pub amount: Decimal,
    pub weighted_amount: Decimal,
}

/// Amount cutoffs selecting the design schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandThresholds {
    pub low: Decimal,
    pub high: Decimal,
}

impl Default for BandThresholds {
    fn default() -> Self {
        Self { low: Decimal::new(15_000, 0), high: Decimal::new(30_000, 0) }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesignBand {
    Small,
    Medium,
    Large,
}

impl BandThresholds {
    pub fn band(&self, amount: Decimal) -> DesignBand {
        if amount < self.low {
            DesignBand::Small
        } else if amount <= self.high {
            DesignBand::Medium
        } else {
            DesignBand::Large
        }
    }
}

/// Spreading shape chosen for a proposal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadShape {
    EvenSplit { months: u32 },
    SingleMonth,
    Design(DesignBand),
}

/// Run of consecutive months sharing one weight. `None` marks a pause.
#[derive(Clone, Copy, Debug)]
struct Phase {
    months: u32,
    weight: Option<Decimal>,
}

impl Phase {
    fn paid(months: u32, weight: Decimal) -> Self {
        Self { months, weight: Some(weight) }
    }

    fn pause(months: u32) -> Self {
        Self { months, weight: None }
    }
}

/// Calendar months from `start`'s month to `end`'s month inclusive; never below 1.
pub fn month_span(start: NaiveDate, end: NaiveDate) -> u32 {
    let span = YearMonth::of(end).ordinal() - YearMonth::of(start).ordinal() + 1;
    u32::try_from(span.max(1)).unwrap_or(1)
}

/// Elapsed duration shorter than one calendar month.
pub fn is_under_one_month(start: NaiveDate, end: NaiveDate) -> bool {
    match shift_months(start, 1) {
        Some(one_month_later) => end < one_month_later,
        None => true,
    }
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub fn select_shape(
    amount: Decimal,
    dates: &ResolvedDates,
    category: &Category,
    bands: &BandThresholds,
) -> SpreadShape {
    let start = dates.effective_start;
    match (category, dates.effective_end) {
        (Category::Design, _) => SpreadShape::Design(bands.band(amount)),
        (Category::Works, Some(end)) if is_under_one_month(start, end) => SpreadShape::SingleMonth,
        (Category::Maintenance | Category::Works | Category::Other(_), Some(end)) => {
            SpreadShape::EvenSplit { months: month_span(start, end) }
        }
        (Category::Maintenance | Category::Works | Category::Other(_), None) => {
            SpreadShape::SingleMonth
        }
    }
}

/// Monthly spread of `amount` starting on the resolved start month.
///
/// Every share but the last paying one is rounded to cents; the last one takes
/// the remainder so the rows always sum to `amount`.
pub fn allocate(
    amount: Decimal,
    dates: &ResolvedDates,
    category: &Category,
    bands: &BandThresholds,
) -> Vec<(YearMonth, Decimal)> {
    let shape = select_shape(amount, dates, category, bands);
    spread_phases(amount, YearMonth::of(dates.effective_start), &phases(shape))
}

fn phases(shape: SpreadShape) -> Vec<Phase> {
    let forty = Decimal::new(40, 2);
    let sixty = Decimal::new(60, 2);
    match shape {
        SpreadShape::EvenSplit { months } => vec![Phase::paid(months, Decimal::ONE)],
        SpreadShape::SingleMonth => vec![Phase::paid(1, Decimal::ONE)],
        SpreadShape::Design(DesignBand::Small) => vec![Phase::paid(3, Decimal::ONE)],
        SpreadShape::Design(DesignBand::Medium) => {
            vec![Phase::paid(6, sixty), Phase::pause(6), Phase::paid(6, forty)]
        }
        SpreadShape::Design(DesignBand::Large) => {
            vec![Phase::paid(12, forty), Phase::pause(6), Phase::paid(12, sixty)]
        }
    }
}

fn spread_phases(amount: Decimal, anchor: YearMonth, phases: &[Phase]) -> Vec<(YearMonth, Decimal)> {
    let mut rows = Vec::new();
    let mut last_paid = None;
    let mut month = anchor;

    for phase in phases {
        let share = phase
            .weight
            .map(|weight| round_money(amount * weight / Decimal::from(phase.months.max(1))));
        for _ in 0..phase.months {
            if share.is_some() {
                last_paid = Some(rows.len());
            }
            rows.push((month, share.unwrap_or(Decimal::ZERO)));
            month = month.next();
        }
    }

    if let Some(index) = last_paid {
        let others: Decimal = rows
            .iter()
            .enumerate()
            .filter(|(position, _)| *position != index)
            .map(|(_, (_, value))| *value)
            .sum();
        rows[index].1 = amount - others;
    }

    rows
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    use super::{
        allocate, is_under_one_month, month_span, select_shape, BandThresholds, DesignBand,
        SpreadShape,
    };
    use crate::dates::{DateRule, ResolvedDates};
    use crate::domain::month::YearMonth;
    use crate::domain::proposal::Category;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    fn dates(start: NaiveDate, end: Option<NaiveDate>) -> ResolvedDates {
        ResolvedDates {
            effective_start: start,
            effective_end: end,
            rule_applied: DateRule::None,
            one_month_fallback: false,
        }
    }

    fn total(rows: &[(YearMonth, Decimal)]) -> Decimal {
        rows.iter().map(|(_, value)| *value).sum()
    }

    #[test]
    fn month_span_counts_calendar_months_inclusive() {
        assert_eq!(month_span(date(2025, 1, 31), date(2025, 2, 1)), 2);
        assert_eq!(month_span(date(2025, 3, 10), date(2025, 3, 20)), 1);
        assert_eq!(month_span(date(2024, 4, 1), date(2025, 3, 31)), 12);
        assert_eq!(month_span(date(2025, 5, 1), date(2025, 4, 1)), 1);
    }

    #[test]
    fn under_one_month_compares_elapsed_time() {
        assert!(is_under_one_month(date(2025, 3, 10), date(2025, 4, 9)));
        assert!(!is_under_one_month(date(2025, 3, 10), date(2025, 4, 10)));
        assert!(is_under_one_month(date(2025, 1, 31), date(2025, 2, 27)));
    }

    #[test]
    fn maintenance_spreads_evenly_over_twelve_months() {
        let rows = allocate(
            Decimal::new(12_000, 0),
            &dates(date(2025, 1, 1), Some(date(2025, 12, 31))),
            &Category::Maintenance,
            &BandThresholds::default(),
        );

        assert_eq!(rows.len(), 12);
        assert!(rows.iter().all(|(_, value)| *value == Decimal::new(1_000, 0)));
        assert_eq!(rows[0].0, YearMonth::january(2025));
        assert_eq!(rows[11].0, YearMonth::december(2025));
    }

    #[test]
    fn short_works_land_in_start_month() {
        let rows = allocate(
            Decimal::new(5_000, 0),
            &dates(date(2025, 3, 10), Some(date(2025, 3, 25))),
            &Category::Works,
            &BandThresholds::default(),
        );
        assert_eq!(rows, vec![(YearMonth { year: 2025, month: 3 }, Decimal::new(5_000, 0))]);
    }

    #[test]
    fn short_works_across_a_month_boundary_stay_in_start_month() {
        let bands = BandThresholds::default();
        let rows = allocate(
            Decimal::new(5_000, 0),
            &dates(date(2025, 3, 25), Some(date(2025, 4, 5))),
            &Category::Works,
            &bands,
        );
        assert_eq!(rows, vec![(YearMonth { year: 2025, month: 3 }, Decimal::new(5_000, 0))]);

        let rows = allocate(
            Decimal::new(5_000, 0),
            &dates(date(2025, 3, 25), Some(date(2025, 4, 25))),
            &Category::Works,
            &bands,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], (YearMonth { year: 2025, month: 4 }, Decimal::new(2_500, 0)));
    }

    #[test]
    fn uneven_split_puts_remainder_on_final_month() {
        let rows = allocate(
            Decimal::new(10_000, 0),
            &dates(date(2025, 1, 1), Some(date(2025, 3, 1))),
            &Category::other(),
            &BandThresholds::default(),
        );

        assert_eq!(rows[0].1, Decimal::new(333_333, 2));
        assert_eq!(rows[1].1, Decimal::new(333_333, 2));
        assert_eq!(rows[2].1, Decimal::new(333_334, 2));
        assert_eq!(total(&rows), Decimal::new(10_000, 0));
    }

    #[test]
    fn small_design_spans_three_months() {
        let rows = allocate(
            Decimal::new(9_000, 0),
            &dates(date(2025, 11, 5), None),
            &Category::Design,
            &BandThresholds::default(),
        );
        let months: Vec<_> = rows.iter().map(|(month, _)| month.to_string()).collect();
        assert_eq!(months, vec!["2025-11", "2025-12", "2026-01"]);
        assert!(rows.iter().all(|(_, value)| *value == Decimal::new(3_000, 0)));
    }

    #[test]
    fn medium_design_pauses_between_phases() {
        let rows = allocate(
            Decimal::new(24_000, 0),
            &dates(date(2025, 1, 1), None),
            &Category::Design,
            &BandThresholds::default(),
        );

        assert_eq!(rows.len(), 18);
        assert!(rows[..6].iter().all(|(_, value)| *value == Decimal::new(2_400, 0)));
        assert!(rows[6..12].iter().all(|(_, value)| value.is_zero()));
        assert!(rows[12..].iter().all(|(_, value)| *value == Decimal::new(1_600, 0)));
        assert_eq!(rows[17].0, YearMonth { year: 2026, month: 6 });
    }

    #[test]
    fn large_design_back_loads_sixty_percent() {
        let rows = allocate(
            Decimal::new(60_000, 0),
            &dates(date(2025, 1, 1), None),
            &Category::Design,
            &BandThresholds::default(),
        );

        assert_eq!(rows.len(), 30);
        assert!(rows[..12].iter().all(|(_, value)| *value == Decimal::new(2_000, 0)));
        assert!(rows[12..18].iter().all(|(_, value)| value.is_zero()));
        assert!(rows[18..].iter().all(|(_, value)| *value == Decimal::new(3_000, 0)));
        assert_eq!(total(&rows), Decimal::new(60_000, 0));
    }

    #[test]
    fn band_boundaries_are_inclusive_in_the_middle() {
        let bands = BandThresholds::default();
        assert_eq!(bands.band(Decimal::new(14_999, 0)), DesignBand::Small);
        assert_eq!(bands.band(Decimal::new(15_000, 0)), DesignBand::Medium);
        assert_eq!(bands.band(Decimal::new(30_000, 0)), DesignBand::Medium);
        assert_eq!(bands.band(Decimal::new(30_001, 0)), DesignBand::Large);
    }

    #[test]
    fn missing_end_falls_back_to_single_month() {
        let resolved = dates(date(2025, 6, 1), None);
        let shape = select_shape(
            Decimal::ONE_HUNDRED,
            &resolved,
            &Category::Maintenance,
            &BandThresholds::default(),
        );
        assert_eq!(shape, SpreadShape::SingleMonth);
    }

    #[test]
    fn zero_and_negative_amounts_keep_the_shape() {
        let resolved = dates(date(2025, 1, 1), Some(date(2025, 4, 30)));
        let zero = allocate(Decimal::ZERO, &resolved, &Category::Works, &BandThresholds::default());
        assert_eq!(zero.len(), 4);
        assert!(zero.iter().all(|(_, value)| value.is_zero()));

        let credit = allocate(Decimal::new(-1_000, 0), &resolved, &Category::Works, &BandThresholds::default());
        assert_eq!(credit[0].1, Decimal::new(-250, 0));
        assert_eq!(total(&credit), Decimal::new(-1_000, 0));
    }

    fn any_category() -> impl Strategy<Value = Category> {
        prop_oneof![
            Just(Category::Maintenance),
            Just(Category::Works),
            Just(Category::Design),
            Just(Category::other()),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn allocation_always_sums_to_amount(
            cents in -10_000_000i64..100_000_000i64,
            start_offset in 0i64..2_000,
            length in 0i64..900,
            category in any_category(),
        ) {
            let start = date(2022, 1, 1) + chrono::Duration::days(start_offset);
            let end = start + chrono::Duration::days(length);
            let amount = Decimal::new(cents, 2);
            let rows = allocate(amount, &dates(start, Some(end)), &category, &BandThresholds::default());

            prop_assert!(!rows.is_empty());
            prop_assert_eq!(total(&rows), amount);
            prop_assert!(rows.windows(2).all(|pair| pair[0].0 < pair[1].0));
        }
    }
}
