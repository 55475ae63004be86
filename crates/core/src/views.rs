use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::month::YearMonth;
use crate::domain::proposal::{ProposalId, ProposalStatus};
use crate::engine::ProposalRecord;
use crate::reconcile::AmountBasis;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewKind {
    /// Every pending proposal.
    Snapshot,
    /// Pending proposals created in the reference month.
    SentMonth,
    /// Won proposals signed or dated in the reference month.
    WonMonth,
}

impl ViewKind {
    /// Pending views are weighted; the won view uses raw amounts.
    pub fn basis(self) -> AmountBasis {
        match self {
            ViewKind::Snapshot | ViewKind::SentMonth => AmountBasis::Weighted,
            ViewKind::WonMonth => AmountBasis::Raw,
        }
    }

    pub fn includes(self, record: &ProposalRecord, month: YearMonth) -> bool {
        let in_month =
            |date: Option<NaiveDate>| date.is_some_and(|date| YearMonth::of(date) == month);
        match self {
            ViewKind::Snapshot => record.status == ProposalStatus::Pending,
            ViewKind::SentMonth => {
                record.status == ProposalStatus::Pending && in_month(record.creation_date)
            }
            ViewKind::WonMonth => {
                record.status == ProposalStatus::Won
                    && (in_month(record.signature_date) || in_month(record.proposal_date))
            }
        }
    }
}

/// Sums for one category or typology within a view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub group: String,
    pub count: usize,
    pub amount: Decimal,
    /// Published revenue fields of the view's basis, summed.
    pub fields: BTreeMap<String, Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewResult {
    pub kind: ViewKind,
    pub month: YearMonth,
    pub basis: AmountBasis,
    pub proposal_ids: Vec<ProposalId>,
    pub by_category: Vec<GroupSummary>,
    pub by_typology: Vec<GroupSummary>,
}

impl ViewResult {
    pub fn count(&self) -> usize {
        self.proposal_ids.len()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyViews {
    pub snapshot: ViewResult,
    pub sent_month: ViewResult,
    pub won_month: ViewResult,
}

fn field_prefix(basis: AmountBasis) -> &'static str {
    match basis {
        AmountBasis::Raw => "TotalAmount_",
        AmountBasis::Weighted => "WeightedAmount_",
    }
}

fn summarize<'a, F>(
    records: &[&'a ProposalRecord],
    basis: AmountBasis,
    group_of: F,
) -> Vec<GroupSummary>
where
    F: Fn(&'a ProposalRecord) -> Option<String>,
{
    let prefix = field_prefix(basis);
    let mut groups: BTreeMap<String, GroupSummary> = BTreeMap::new();

    for &record in records {
        let Some(group) = group_of(record) else {
            continue;
        };
        let summary = groups.entry(group.clone()).or_insert_with(|| GroupSummary {
            group,
            count: 0,
            amount: Decimal::ZERO,
            fields: BTreeMap::new(),
        });
        summary.count += 1;
        summary.amount += record.amount;
        for (name, value) in record.revenue.fields() {
            if name.starts_with(prefix) {
                *summary.fields.entry(name).or_default() += value;
            }
        }
    }

    groups.into_values().collect()
}

/// Builds one view of `records` for the reference `month`.
///
/// Typology summaries book each proposal under its primary typology only;
/// proposals without one are left out of that summary.
pub fn build_view(records: &[ProposalRecord], kind: ViewKind, month: YearMonth) -> ViewResult {
    let selected: Vec<&ProposalRecord> =
        records.iter().filter(|record| kind.includes(record, month)).collect();
    let basis = kind.basis();

    ViewResult {
        kind,
        month,
        basis,
        proposal_ids: selected.iter().map(|record| record.proposal_id.clone()).collect(),
        by_category: summarize(&selected, basis, |record| {
            Some(record.category.label().to_string())
        }),
        by_typology: summarize(&selected, basis, |record| record.primary_typology.clone()),
    }
}

pub fn monthly_views(records: &[ProposalRecord], today: NaiveDate) -> MonthlyViews {
    let month = YearMonth::of(today);
    MonthlyViews {
        snapshot: build_view(records, ViewKind::Snapshot, month),
        sent_month: build_view(records, ViewKind::SentMonth, month),
        won_month: build_view(records, ViewKind::WonMonth, month),
    }
}
