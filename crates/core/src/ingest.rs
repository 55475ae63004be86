use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::StatusConfig;
use crate::domain::proposal::{Proposal, ProposalId, ProposalStatus};

/// A proposal as the fetch collaborator hands it over: loosely typed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawProposal {
    pub id: Value,
    pub title: Value,
    pub amount: Value,
    pub probability: Value,
    pub category: Value,
    pub typology: Value,
    pub status: Value,
    pub creation_date: Value,
    #[serde(alias = "date")]
    pub proposal_date: Value,
    pub start_date: Value,
    pub end_date: Value,
    pub signature_date: Value,
    #[serde(alias = "assigned_to")]
    pub owner: Value,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not decode proposal batch: {0}")]
    Decode(#[from] serde_json::Error),
}

pub fn parse_batch(input: &str) -> Result<Vec<RawProposal>, IngestError> {
    Ok(serde_json::from_str(input)?)
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.trim().to_string()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Reads a `YYYY-MM-DD` prefix. Blank, `None` and year-zero values are missing.
pub fn parse_date(value: &Value) -> Option<NaiveDate> {
    let raw = text(value)?;
    if raw.is_empty() || raw.eq_ignore_ascii_case("none") || raw.starts_with("0000") {
        return None;
    }
    let day = raw.get(..10).unwrap_or(raw.as_str());
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn parse_decimal(value: &Value) -> Option<Decimal> {
    let raw = text(value)?.replace([' ', '\u{a0}'], "").replace(',', ".");
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)).ok()
}

/// Unreadable or missing amounts count as zero.
pub fn parse_amount(value: &Value) -> Decimal {
    parse_decimal(value).unwrap_or(Decimal::ZERO)
}

/// Unreadable or missing probabilities stay unknown; weighting decides later.
pub fn parse_probability(value: &Value) -> Option<Decimal> {
    parse_decimal(value)
}

pub fn parse_status(value: &Value, statuses: &StatusConfig) -> ProposalStatus {
    let Some(raw) = text(value).map(|status| status.to_lowercase()) else {
        return ProposalStatus::Other;
    };
    let listed =
        |values: &[String]| values.iter().any(|candidate| candidate.trim().to_lowercase() == raw);

    if listed(&statuses.won) {
        ProposalStatus::Won
    } else if listed(&statuses.pending) {
        ProposalStatus::Pending
    } else if listed(&statuses.lost) {
        ProposalStatus::Lost
    } else {
        ProposalStatus::Other
    }
}

pub fn normalize(raw: &RawProposal, statuses: &StatusConfig) -> Proposal {
    Proposal {
        id: ProposalId(text(&raw.id).unwrap_or_default()),
        title: text(&raw.title).unwrap_or_default(),
        amount: parse_amount(&raw.amount),
        probability_percent: parse_probability(&raw.probability),
        category_hint: text(&raw.category).unwrap_or_default(),
        typology: text(&raw.typology).filter(|typology| !typology.is_empty()),
        creation_date: parse_date(&raw.creation_date),
        proposal_date: parse_date(&raw.proposal_date),
        start_date: parse_date(&raw.start_date),
        end_date: parse_date(&raw.end_date),
        signature_date: parse_date(&raw.signature_date),
        status: parse_status(&raw.status, statuses),
        owner: text(&raw.owner).filter(|owner| !owner.is_empty()),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::{normalize, parse_amount, parse_batch, parse_date, IngestError};
    use crate::config::EngineConfig;
    use crate::domain::proposal::ProposalStatus;

    #[test]
    fn dates_accept_timestamps_and_reject_placeholders() {
        assert_eq!(parse_date(&json!("2025-03-04T10:00:00Z")), NaiveDate::from_ymd_opt(2025, 3, 4));
        assert_eq!(parse_date(&json!("0000-00-00")), None);
        assert_eq!(parse_date(&json!("None")), None);
        assert_eq!(parse_date(&json!("")), None);
        assert_eq!(parse_date(&json!("04/03/2025")), None);
        assert_eq!(parse_date(&json!(null)), None);
    }

    #[test]
    fn amounts_fall_back_to_zero() {
        assert_eq!(parse_amount(&json!("12 500,50")), Decimal::new(1_250_050, 2));
        assert_eq!(parse_amount(&json!(4200)), Decimal::new(4_200, 0));
        assert_eq!(parse_amount(&json!("n/a")), Decimal::ZERO);
        assert_eq!(parse_amount(&json!(null)), Decimal::ZERO);
    }

    #[test]
    fn normalizes_a_crm_record() {
        let config = EngineConfig::default();
        let raw = parse_batch(
            &json!([{
                "id": 981,
                "title": "Rooftop garden",
                "amount": "18000",
                "probability": "",
                "category": "Design",
                "typology": "Garden Design",
                "status": " Signed ",
                "creation_date": "2025-01-10",
                "date": "2025-01-12",
                "assigned_to": " camille ",
                "start_date": "0000-00-00",
                "end_date": null,
                "signature_date": "2025-02-01 09:12:00"
            }])
            .to_string(),
        )
        .expect("batch decodes");

        let proposal = normalize(&raw[0], &config.status);
        assert_eq!(proposal.id.0, "981");
        assert_eq!(proposal.amount, Decimal::new(18_000, 0));
        assert_eq!(proposal.probability_percent, None);
        assert_eq!(proposal.status, ProposalStatus::Won);
        assert_eq!(proposal.start_date, None);
        assert_eq!(proposal.signature_date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!(proposal.typology.as_deref(), Some("Garden Design"));
        assert_eq!(proposal.proposal_date, NaiveDate::from_ymd_opt(2025, 1, 12));
        assert_eq!(proposal.owner.as_deref(), Some("camille"));
    }

    #[test]
    fn unknown_status_maps_to_other() {
        let config = EngineConfig::default();
        let raw =
            parse_batch(r#"[{"id": "x", "status": "archived"}, {"id": "y", "status": "Sent"}]"#)
                .expect("batch decodes");
        assert_eq!(normalize(&raw[0], &config.status).status, ProposalStatus::Other);
        assert_eq!(normalize(&raw[1], &config.status).status, ProposalStatus::Pending);
    }

    #[test]
    fn malformed_batch_is_a_decode_error() {
        assert!(matches!(parse_batch("{not json"), Err(IngestError::Decode(_))));
    }
}
