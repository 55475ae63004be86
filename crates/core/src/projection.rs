use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::domain::proposal::{Category, Proposal, ProposalId, ProposalStatus};

/// A pending works deal likely to sign soon.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectedWorks {
    pub proposal_id: ProposalId,
    pub title: String,
    pub amount: Decimal,
    pub probability: Decimal,
    /// Date that put the proposal inside the window.
    pub anchor_date: NaiveDate,
}

/// Selects pending works proposals above the probability threshold whose
/// creation or start date falls within `[today, today + window]`.
///
/// A missing probability counts as 50 %. `categorize` returns the proposal's
/// category so callers keep a single classification source.
pub fn project_works<F>(
    proposals: &[Proposal],
    today: NaiveDate,
    settings: &ProjectionConfig,
    categorize: F,
) -> Vec<ProjectedWorks>
where
    F: Fn(&Proposal) -> Category,
{
    let window_end = window_end(today, settings.start_window_days);
    let in_window = |date: &NaiveDate| (today..=window_end).contains(date);

    proposals
        .iter()
        .filter(|proposal| proposal.status == ProposalStatus::Pending)
        .filter(|proposal| categorize(proposal) == Category::Works)
        .filter_map(|proposal| {
            let probability =
                proposal.probability_percent.unwrap_or_else(|| Decimal::new(50, 0));
            if probability < settings.probability_threshold {
                return None;
            }
            let anchor_date = [proposal.creation_date, proposal.start_date]
                .into_iter()
                .flatten()
                .find(|date| in_window(date))?;
            Some(ProjectedWorks {
                proposal_id: proposal.id.clone(),
                title: proposal.title.clone(),
                amount: proposal.amount,
                probability,
                anchor_date,
            })
        })
        .collect()
}

/// Last day of a look-ahead window. A window running past the calendar ends
/// on the last representable date.
pub fn window_end(today: NaiveDate, days: i64) -> NaiveDate {
    Duration::try_days(days)
        .and_then(|window| today.checked_add_signed(window))
        .unwrap_or(NaiveDate::MAX)
}
