use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::month::shift_months;
use crate::domain::proposal::Category;
use crate::errors::AllocationError;

/// Months added to a maintenance start to reach its end (12-month span).
pub const MAINTENANCE_EXTENSION_MONTHS: i32 = 11;
/// Months added to a works start to reach its end (6-month span).
pub const WORKS_EXTENSION_MONTHS: i32 = 5;

/// Which inference rule filled the missing dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRule {
    None,
    StartMissing,
    EndMissing,
    BothMissing,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedDates {
    pub effective_start: NaiveDate,
    /// `None` only for design, whose schedule is anchored on the start.
    pub effective_end: Option<NaiveDate>,
    pub rule_applied: DateRule,
    /// Set when an inferred start landed after the given end and the end was
    /// pulled back onto the start.
    pub one_month_fallback: bool,
}

impl ResolvedDates {
    fn new(start: NaiveDate, end: Option<NaiveDate>, rule: DateRule) -> Self {
        Self {
            effective_start: start,
            effective_end: end,
            rule_applied: rule,
            one_month_fallback: false,
        }
    }
}

/// Fills missing project dates according to the category.
///
/// The proposal's own dates are never touched; callers keep the result next to
/// the proposal.
pub fn resolve(
    category: &Category,
    creation: Option<NaiveDate>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<ResolvedDates, AllocationError> {
    match (start, end) {
        (Some(start), Some(end)) => {
            if start > end {
                return Err(AllocationError::InvalidDateRange { start, end });
            }
            Ok(ResolvedDates::new(start, Some(end), DateRule::None))
        }
        (None, Some(end)) => resolve_missing_start(category, creation, end),
        (Some(start), None) => Ok(ResolvedDates::new(
            start,
            extend(category, start),
            DateRule::EndMissing,
        )),
        (None, None) => {
            let start = creation.ok_or(AllocationError::UnresolvableDates)?;
            Ok(ResolvedDates::new(start, extend(category, start), DateRule::BothMissing))
        }
    }
}

fn resolve_missing_start(
    category: &Category,
    creation: Option<NaiveDate>,
    end: NaiveDate,
) -> Result<ResolvedDates, AllocationError> {
    match category {
        Category::Maintenance => {
            let start = shift_months(end, -MAINTENANCE_EXTENSION_MONTHS).unwrap_or(end);
            Ok(ResolvedDates::new(start, Some(end), DateRule::StartMissing))
        }
        Category::Design => {
            let start = creation.ok_or(AllocationError::UnresolvableDates)?;
            Ok(ResolvedDates::new(start, None, DateRule::StartMissing))
        }
        Category::Works | Category::Other(_) => {
            let start = creation.ok_or(AllocationError::UnresolvableDates)?;
            let mut resolved = ResolvedDates::new(start, Some(end), DateRule::StartMissing);
            if start > end {
                resolved.effective_end = Some(start);
                resolved.one_month_fallback = true;
            }
            Ok(resolved)
        }
    }
}

/// Inferred end for a known start; design has none.
fn extend(category: &Category, start: NaiveDate) -> Option<NaiveDate> {
    let months = match category {
        Category::Maintenance => MAINTENANCE_EXTENSION_MONTHS,
        Category::Works | Category::Other(_) => WORKS_EXTENSION_MONTHS,
        Category::Design => return None,
    };
    Some(shift_months(start, months).unwrap_or(start))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{resolve, DateRule};
    use crate::domain::proposal::Category;
    use crate::errors::AllocationError;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn complete_dates_pass_through() {
        let resolved = resolve(
            &Category::Works,
            Some(date(2024, 1, 1)),
            Some(date(2025, 2, 1)),
            Some(date(2025, 4, 30)),
        )
        .expect("dates resolve");

        assert_eq!(resolved.rule_applied, DateRule::None);
        assert_eq!(resolved.effective_start, date(2025, 2, 1));
        assert_eq!(resolved.effective_end, Some(date(2025, 4, 30)));
    }

    #[test]
    fn inverted_dates_are_rejected() {
        let error = resolve(&Category::Maintenance, None, Some(date(2025, 6, 1)), Some(date(2025, 5, 1)))
            .expect_err("inverted range must fail");
        assert_eq!(
            error,
            AllocationError::InvalidDateRange { start: date(2025, 6, 1), end: date(2025, 5, 1) }
        );
    }

    #[test]
    fn maintenance_start_is_inferred_eleven_months_before_end() {
        let resolved = resolve(&Category::Maintenance, None, None, Some(date(2025, 3, 31)))
            .expect("dates resolve");

        assert_eq!(resolved.rule_applied, DateRule::StartMissing);
        assert_eq!(resolved.effective_start, date(2024, 4, 30));
        assert_eq!(resolved.effective_end, Some(date(2025, 3, 31)));
    }

    #[test]
    fn works_start_falls_back_to_creation() {
        let resolved = resolve(
            &Category::Works,
            Some(date(2025, 1, 15)),
            None,
            Some(date(2025, 5, 31)),
        )
        .expect("dates resolve");
        assert_eq!(resolved.effective_start, date(2025, 1, 15));
        assert!(!resolved.one_month_fallback);
    }

    #[test]
    fn works_creation_after_end_collapses_to_one_month() {
        let resolved = resolve(
            &Category::Other("LANDSCAPING".into()),
            Some(date(2025, 7, 1)),
            None,
            Some(date(2025, 5, 31)),
        )
        .expect("dates resolve");

        assert_eq!(resolved.effective_start, date(2025, 7, 1));
        assert_eq!(resolved.effective_end, Some(date(2025, 7, 1)));
        assert!(resolved.one_month_fallback);
    }

    #[test]
    fn design_keeps_end_unresolved() {
        let resolved = resolve(&Category::Design, Some(date(2025, 2, 3)), None, Some(date(2025, 9, 1)))
            .expect("dates resolve");
        assert_eq!(resolved.effective_start, date(2025, 2, 3));
        assert_eq!(resolved.effective_end, None);

        let resolved =
            resolve(&Category::Design, None, Some(date(2025, 4, 1)), None).expect("dates resolve");
        assert_eq!(resolved.rule_applied, DateRule::EndMissing);
        assert_eq!(resolved.effective_end, None);
    }

    #[test]
    fn end_is_extended_per_category() {
        let start = Some(date(2025, 1, 31));
        let maintenance = resolve(&Category::Maintenance, None, start, None).expect("dates resolve");
        assert_eq!(maintenance.effective_end, Some(date(2025, 12, 31)));

        let works = resolve(&Category::Works, None, start, None).expect("dates resolve");
        assert_eq!(works.effective_end, Some(date(2025, 6, 30)));
        assert_eq!(works.rule_applied, DateRule::EndMissing);
    }

    #[test]
    fn both_missing_anchor_on_creation() {
        let creation = Some(date(2024, 11, 10));
        let resolved = resolve(&Category::Maintenance, creation, None, None).expect("dates resolve");
        assert_eq!(resolved.rule_applied, DateRule::BothMissing);
        assert_eq!(resolved.effective_start, date(2024, 11, 10));
        assert_eq!(resolved.effective_end, Some(date(2025, 10, 10)));

        let works = resolve(&Category::other(), creation, None, None).expect("dates resolve");
        assert_eq!(works.effective_end, Some(date(2025, 4, 10)));
    }

    #[test]
    fn missing_creation_is_unresolvable_when_needed() {
        assert_eq!(
            resolve(&Category::Works, None, None, None),
            Err(AllocationError::UnresolvableDates)
        );
        assert_eq!(
            resolve(&Category::Design, None, None, Some(date(2025, 1, 1))),
            Err(AllocationError::UnresolvableDates)
        );
        assert!(resolve(&Category::Maintenance, None, None, Some(date(2025, 1, 1))).is_ok());
    }
}
