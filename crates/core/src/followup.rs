use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::FollowupConfig;
use crate::domain::proposal::{Category, Proposal, ProposalId, ProposalStatus};
use crate::projection::window_end;

pub const UNASSIGNED_OWNER: &str = "unassigned";

/// A pending proposal the sales owner should chase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowupCandidate {
    pub proposal_id: ProposalId,
    pub title: String,
    pub category: Category,
    pub amount: Decimal,
    pub probability_percent: Option<Decimal>,
    pub proposal_date: NaiveDate,
    pub start_date: Option<NaiveDate>,
    pub window_end: NaiveDate,
}

/// First day of the month before `today`.
pub fn followup_window_start(today: NaiveDate) -> NaiveDate {
    today
        .with_day(1)
        .and_then(|first| first.checked_sub_months(Months::new(1)))
        .unwrap_or(NaiveDate::MIN)
}

pub fn owner_of(proposal: &Proposal) -> &str {
    proposal.owner.as_deref().unwrap_or(UNASSIGNED_OWNER)
}

/// Whether a pending proposal sits inside its owner's follow-up window.
///
/// The proposal date must be on or after [`followup_window_start`]. Design
/// proposals must also be dated before the window end; every other category
/// passes when either the proposal date or the start date is before it.
pub fn needs_followup(
    proposal: &Proposal,
    category: &Category,
    today: NaiveDate,
    settings: &FollowupConfig,
) -> bool {
    if proposal.status != ProposalStatus::Pending {
        return false;
    }
    let Some(proposal_date) = proposal.proposal_date else {
        return false;
    };
    if proposal_date < followup_window_start(today) {
        return false;
    }

    let end = window_end(today, settings.days_forward_for(owner_of(proposal)));
    match category {
        Category::Design => proposal_date <= end,
        _ => proposal_date <= end || proposal.start_date.is_some_and(|start| start <= end),
    }
}

/// Follow-up list grouped by owner, input order kept within each owner.
pub fn select_followups<F>(
    proposals: &[Proposal],
    today: NaiveDate,
    settings: &FollowupConfig,
    categorize: F,
) -> BTreeMap<String, Vec<FollowupCandidate>>
where
    F: Fn(&Proposal) -> Category,
{
    let mut grouped: BTreeMap<String, Vec<FollowupCandidate>> = BTreeMap::new();

    for proposal in proposals {
        let category = categorize(proposal);
        if !needs_followup(proposal, &category, today, settings) {
            continue;
        }
        let Some(proposal_date) = proposal.proposal_date else {
            continue;
        };
        let owner = owner_of(proposal);
        grouped.entry(owner.to_string()).or_default().push(FollowupCandidate {
            proposal_id: proposal.id.clone(),
            title: proposal.title.clone(),
            category,
            amount: proposal.amount,
            probability_percent: proposal.probability_percent,
            proposal_date,
            start_date: proposal.start_date,
            window_end: window_end(today, settings.days_forward_for(owner)),
        });
    }

    grouped
}
