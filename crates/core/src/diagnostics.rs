use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::proposal::{Proposal, ProposalId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataQualityFlag {
    MissingStart,
    MissingEnd,
    StartAfterEnd,
    ZeroProbability,
    AmountBelowThreshold,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDiagnostic {
    pub proposal_id: ProposalId,
    pub title: String,
    pub flags: Vec<DataQualityFlag>,
}

pub fn flags_for(proposal: &Proposal, amount_threshold: Decimal) -> Vec<DataQualityFlag> {
    let checks = [
        (proposal.start_date.is_none(), DataQualityFlag::MissingStart),
        (proposal.end_date.is_none(), DataQualityFlag::MissingEnd),
        (proposal.has_raw_date_inversion(), DataQualityFlag::StartAfterEnd),
        (
            proposal.probability_percent.is_some_and(|probability| probability.is_zero()),
            DataQualityFlag::ZeroProbability,
        ),
        (proposal.amount < amount_threshold, DataQualityFlag::AmountBelowThreshold),
    ];

    checks.into_iter().filter_map(|(raised, flag)| raised.then_some(flag)).collect()
}

/// Data-quality report; proposals without any flag are left out.
pub fn diagnose(proposals: &[Proposal], amount_threshold: Decimal) -> Vec<ProposalDiagnostic> {
    proposals
        .iter()
        .filter_map(|proposal| {
            let flags = flags_for(proposal, amount_threshold);
            (!flags.is_empty()).then(|| ProposalDiagnostic {
                proposal_id: proposal.id.clone(),
                title: proposal.title.clone(),
                flags,
            })
        })
        .collect()
}
