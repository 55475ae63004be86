use std::collections::BTreeMap;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounting::AccountingCalendar;
use crate::allocation::{round_money, MonthlyAllocation};
use crate::domain::month::Quarter;
use crate::engine::ProposalRecord;
use crate::horizon::Horizon;

/// Probability used when weighting an amount. Missing or zero counts as 50 %.
pub fn weighting_probability(probability_percent: Option<Decimal>) -> Decimal {
    match probability_percent {
        Some(value) if !value.is_zero() => value,
        _ => Decimal::new(50, 0),
    }
}

pub fn weighted_amount(amount: Decimal, probability_percent: Option<Decimal>) -> Decimal {
    amount * weighting_probability(probability_percent) / Decimal::ONE_HUNDRED
}

/// Raw and probability-weighted sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub raw: Decimal,
    pub weighted: Decimal,
}

impl Totals {
    pub fn new(raw: Decimal, weighted: Decimal) -> Self {
        Self { raw, weighted }
    }

    pub fn of(allocation: &MonthlyAllocation) -> Self {
        Self::new(allocation.amount, allocation.weighted_amount)
    }

    pub fn pick(&self, weighted: bool) -> Decimal {
        if weighted {
            self.weighted
        } else {
            self.raw
        }
    }
}

impl Add for Totals {
    type Output = Totals;

    fn add(self, rhs: Totals) -> Totals {
        Totals::new(self.raw + rhs.raw, self.weighted + rhs.weighted)
    }
}

impl AddAssign for Totals {
    fn add_assign(&mut self, rhs: Totals) {
        *self = *self + rhs;
    }
}

impl Sum for Totals {
    fn sum<I: Iterator<Item = Totals>>(iter: I) -> Self {
        iter.fold(Totals::default(), Add::add)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRevenue {
    pub year: i32,
    pub total: Totals,
    pub quarters: [Totals; 4],
}

impl YearRevenue {
    pub fn quarter(&self, quarter: Quarter) -> Totals {
        self.quarters[quarter.index()]
    }
}

/// Per-year and per-quarter revenue of one proposal over the horizon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalRevenue {
    pub years: Vec<YearRevenue>,
}

impl ProposalRevenue {
    /// Rolls clamped allocations up per horizon year. Months outside the
    /// horizon are ignored, which cannot happen after clamping.
    pub fn from_allocations(horizon: &Horizon, allocations: &[MonthlyAllocation]) -> Self {
        let years = horizon
            .year_range()
            .map(|year| {
                let mut quarters = [Totals::default(); 4];
                for allocation in allocations.iter().filter(|row| row.month.year == year) {
                    quarters[allocation.month.quarter().index()] += Totals::of(allocation);
                }
                YearRevenue { year, total: quarters.iter().copied().sum(), quarters }
            })
            .collect();

        Self { years }
    }

    pub fn year(&self, year: i32) -> Option<&YearRevenue> {
        self.years.iter().find(|revenue| revenue.year == year)
    }

    pub fn total(&self) -> Totals {
        self.years.iter().map(|revenue| revenue.total).sum()
    }

    /// Flat named fields handed to the spreadsheet collaborator, zeros included.
    ///
    /// Quarters are rounded to cents and each year is the sum of its rounded
    /// quarters, so the published fields add up exactly.
    pub fn fields(&self) -> Vec<(String, Decimal)> {
        let mut fields = Vec::with_capacity(self.years.len() * 10);
        for revenue in &self.years {
            let year = revenue.year;
            let quarters = revenue.quarters.map(|totals| {
                Totals::new(round_money(totals.raw), round_money(totals.weighted))
            });
            let total: Totals = quarters.iter().copied().sum();

            fields.push((format!("TotalAmount_{year}"), total.raw));
            fields.push((format!("WeightedAmount_{year}"), total.weighted));
            for quarter in Quarter::ALL {
                let totals = quarters[quarter.index()];
                let number = quarter.number();
                fields.push((format!("TotalAmount_Q{number}_{year}"), totals.raw));
                fields.push((format!("WeightedAmount_Q{number}_{year}"), totals.weighted));
            }
        }
        fields
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "granularity", rename_all = "snake_case")]
pub enum PeriodKey {
    Year { year: i32 },
    Quarter { year: i32, quarter: Quarter },
    AccountingPeriod { year: i32, period: usize },
}

impl PeriodKey {
    pub fn year(&self) -> i32 {
        match self {
            PeriodKey::Year { year }
            | PeriodKey::Quarter { year, .. }
            | PeriodKey::AccountingPeriod { year, .. } => *year,
        }
    }
}

/// Portfolio sum for one period, with the share coming from deals signed in
/// an earlier year.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub key: PeriodKey,
    pub totals: Totals,
    pub carryover: Totals,
}

pub fn aggregate_portfolio(
    records: &[ProposalRecord],
    calendar: &AccountingCalendar,
) -> Vec<PeriodAggregate> {
    let mut buckets: BTreeMap<PeriodKey, (Totals, Totals)> = BTreeMap::new();

    for record in records {
        for allocation in &record.allocations {
            let year = allocation.month.year;
            let totals = Totals::of(allocation);
            let carried = record.signing_year < year;
            let keys = [
                PeriodKey::Year { year },
                PeriodKey::Quarter { year, quarter: allocation.month.quarter() },
                PeriodKey::AccountingPeriod {
                    year,
                    period: calendar.period_for_month(allocation.month.month),
                },
            ];

            for key in keys {
                let bucket = buckets.entry(key).or_default();
                bucket.0 += totals;
                if carried {
                    bucket.1 += totals;
                }
            }
        }
    }

    buckets
        .into_iter()
        .map(|(key, (totals, carryover))| PeriodAggregate { key, totals, carryover })
        .collect()
}
