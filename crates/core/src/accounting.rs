use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::allocation::round_money;
use crate::domain::month::Quarter;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub const DEFAULT_MERGE_MONTH: u32 = 7;
pub const PERIOD_COUNT: usize = 11;

/// Eleven-period fiscal calendar: one pair of adjacent months is booked as a
/// single period.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingCalendar {
    merge_month: u32,
}

impl Default for AccountingCalendar {
    fn default() -> Self {
        Self { merge_month: DEFAULT_MERGE_MONTH }
    }
}

impl AccountingCalendar {
    /// `merge_month` and the month after it form one period. December cannot
    /// start a pair.
    pub fn new(merge_month: u32) -> Option<Self> {
        (1..=11).contains(&merge_month).then_some(Self { merge_month })
    }

    pub fn merge_month(&self) -> u32 {
        self.merge_month
    }

    pub fn merged_months(&self) -> [u32; 2] {
        [self.merge_month, self.merge_month + 1]
    }

    /// Zero-based period index of a calendar month (1-12).
    pub fn period_for_month(&self, month: u32) -> usize {
        let month = month.clamp(1, 12);
        let index = if month <= self.merge_month { month - 1 } else { month - 2 };
        index as usize
    }

    pub fn months_for_period(&self, period: usize) -> Vec<u32> {
        let merged_index = (self.merge_month - 1) as usize;
        match period {
            index if index < merged_index => vec![index as u32 + 1],
            index if index == merged_index => self.merged_months().to_vec(),
            index if index < PERIOD_COUNT => vec![index as u32 + 2],
            _ => Vec::new(),
        }
    }

    pub fn label(&self, period: usize) -> String {
        self.months_for_period(period)
            .iter()
            .map(|month| MONTH_NAMES[(*month - 1) as usize])
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn count_unique_periods(&self, months: &[u32]) -> usize {
        months
            .iter()
            .filter(|month| (1..=12).contains(*month))
            .map(|month| self.period_for_month(*month))
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Periods touching `quarter`, with how many of the quarter's months each covers.
    pub fn quarter_periods(&self, quarter: Quarter) -> Vec<(usize, u32)> {
        let mut periods: Vec<(usize, u32)> = Vec::new();
        for month in quarter.months() {
            let period = self.period_for_month(month);
            match periods.last_mut() {
                Some((last, count)) if *last == period => *count += 1,
                _ => periods.push((period, 1)),
            }
        }
        periods
    }

    /// Spreads an annual target over the eleven periods.
    ///
    /// The merged pair's first month carries the period value and the second
    /// month stays at zero. The last booked month absorbs the rounding
    /// remainder.
    pub fn monthly_target_distribution(&self, annual_total: Decimal) -> [Decimal; 12] {
        let per_period = round_money(annual_total / Decimal::from(PERIOD_COUNT as u32));
        let second_merged = self.merge_month as usize;

        let mut months = [per_period; 12];
        months[second_merged] = Decimal::ZERO;

        let last_booked = if second_merged == 11 { 10 } else { 11 };
        let others: Decimal = months
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != last_booked)
            .map(|(_, value)| *value)
            .sum();
        months[last_booked] = annual_total - others;
        months
    }
}

/// Amount attributed to one accounting period.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodShare {
    pub period_index: usize,
    pub label: String,
    pub amount: Decimal,
}
