use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounting::{AccountingCalendar, PeriodShare};
use crate::aggregate::Totals;
use crate::allocation::round_money;
use crate::domain::month::{Quarter, YearMonth};
use crate::domain::proposal::Category;
use crate::engine::ProposalRecord;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AmountBasis {
    #[default]
    Raw,
    Weighted,
}

impl AmountBasis {
    pub fn pick(self, totals: Totals) -> Decimal {
        totals.pick(self == AmountBasis::Weighted)
    }
}

/// Slice of the portfolio a reconciliation looks at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Dimension {
    #[default]
    All,
    Category(Category),
    /// Primary typology, compared case-insensitively.
    Typology(String),
}

impl Dimension {
    pub fn matches(&self, record: &ProposalRecord) -> bool {
        match self {
            Dimension::All => true,
            Dimension::Category(category) => record.category == *category,
            Dimension::Typology(typology) => record
                .primary_typology
                .as_deref()
                .is_some_and(|primary| primary.eq_ignore_ascii_case(typology.trim())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionYear {
    pub year: i32,
    pub total: Decimal,
    /// Produced in `year` by deals signed in an earlier year.
    pub carryover: Decimal,
    pub by_signing_year: BTreeMap<i32, Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionQuarter {
    pub year: i32,
    pub quarter: Quarter,
    pub total: Decimal,
    pub carryover: Decimal,
    pub by_signing_year: BTreeMap<i32, Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionPeriod {
    pub year: i32,
    pub period_index: usize,
    pub label: String,
    pub total: Decimal,
    pub carryover: Decimal,
}

/// Sums each signing year's contribution over the months accepted by `in_scope`.
fn contributions_by_signing_year<F>(
    records: &[ProposalRecord],
    basis: AmountBasis,
    dimension: &Dimension,
    in_scope: F,
) -> BTreeMap<i32, Decimal>
where
    F: Fn(YearMonth) -> bool,
{
    let mut by_signing_year = BTreeMap::new();
    for record in records.iter().filter(|record| dimension.matches(record)) {
        for allocation in record.allocations.iter().filter(|row| in_scope(row.month)) {
            *by_signing_year.entry(record.signing_year).or_insert(Decimal::ZERO) +=
                basis.pick(Totals::of(allocation));
        }
    }
    by_signing_year
}

fn split_carryover(year: i32, by_signing_year: &BTreeMap<i32, Decimal>) -> (Decimal, Decimal) {
    let total = by_signing_year.values().copied().sum();
    let carryover = by_signing_year.range(..year).map(|(_, amount)| *amount).sum();
    (total, carryover)
}

/// Production of `year` split by the year each contributing deal was signed.
pub fn reconcile_production_year(
    records: &[ProposalRecord],
    year: i32,
    basis: AmountBasis,
    dimension: &Dimension,
) -> ProductionYear {
    let by_signing_year =
        contributions_by_signing_year(records, basis, dimension, |month| month.year == year);
    let (total, carryover) = split_carryover(year, &by_signing_year);
    ProductionYear { year, total, carryover, by_signing_year }
}

pub fn reconcile_production_quarter(
    records: &[ProposalRecord],
    year: i32,
    quarter: Quarter,
    basis: AmountBasis,
    dimension: &Dimension,
) -> ProductionQuarter {
    let by_signing_year = contributions_by_signing_year(records, basis, dimension, |month| {
        month.year == year && month.quarter() == quarter
    });
    let (total, carryover) = split_carryover(year, &by_signing_year);
    ProductionQuarter { year, quarter, total, carryover, by_signing_year }
}

/// Spreads a quarter's carryover over its accounting periods.
///
/// Each period receives its share of the quarter's months, so a merged pair
/// inside the quarter gets two thirds. The last period absorbs rounding.
pub fn distribute_carryover_to_accounting_periods(
    quarter_carryover: Decimal,
    quarter: Quarter,
    calendar: &AccountingCalendar,
) -> Vec<PeriodShare> {
    let periods = calendar.quarter_periods(quarter);
    let month_count = Decimal::from(quarter.months().len() as u32);

    let mut shares: Vec<PeriodShare> = periods
        .iter()
        .map(|(period, months)| PeriodShare {
            period_index: *period,
            label: calendar.label(*period),
            amount: round_money(quarter_carryover * Decimal::from(*months) / month_count),
        })
        .collect();

    let allotted: Decimal = shares.iter().rev().skip(1).map(|share| share.amount).sum();
    if let Some(last) = shares.last_mut() {
        last.amount = quarter_carryover - allotted;
    }
    shares
}

/// Total and carryover of one accounting period.
///
/// Each calendar month of the period takes a third of its quarter, so the
/// periods of a quarter always add back up to the quarter.
pub fn production_period_with_carryover(
    records: &[ProposalRecord],
    year: i32,
    period_index: usize,
    basis: AmountBasis,
    dimension: &Dimension,
    calendar: &AccountingCalendar,
) -> ProductionPeriod {
    let three = Decimal::from(3u32);
    let mut total = Decimal::ZERO;
    let mut carryover = Decimal::ZERO;

    for month in calendar.months_for_period(period_index) {
        let quarter = reconcile_production_quarter(
            records,
            year,
            Quarter::of_month(month),
            basis,
            dimension,
        );
        total += quarter.total / three;
        carryover += quarter.carryover / three;
    }

    ProductionPeriod {
        year,
        period_index,
        label: calendar.label(period_index),
        total: round_money(total),
        carryover: round_money(carryover),
    }
}
