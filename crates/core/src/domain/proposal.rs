use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProposalId(pub String);

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Won,
    Lost,
    Other,
}

/// Business category driving the spreading rule.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    Maintenance,
    Works,
    Design,
    /// Anything else; carries the upper-cased hint or `OTHER`.
    Other(String),
}

impl Category {
    pub const MAINTENANCE_LABEL: &'static str = "MAINTENANCE";
    pub const WORKS_LABEL: &'static str = "WORKS";
    pub const DESIGN_LABEL: &'static str = "DESIGN";
    pub const OTHER_LABEL: &'static str = "OTHER";

    pub fn other() -> Self {
        Category::Other(Self::OTHER_LABEL.to_string())
    }

    pub fn label(&self) -> &str {
        match self {
            Category::Maintenance => Self::MAINTENANCE_LABEL,
            Category::Works => Self::WORKS_LABEL,
            Category::Design => Self::DESIGN_LABEL,
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.label().to_string()
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_uppercase();
        match normalized.as_str() {
            Category::MAINTENANCE_LABEL => Category::Maintenance,
            Category::WORKS_LABEL => Category::Works,
            Category::DESIGN_LABEL => Category::Design,
            "" => Category::other(),
            _ => Category::Other(normalized),
        }
    }
}

/// Immutable input record as handed over by the fetch collaborator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub amount: Decimal,
    pub probability_percent: Option<Decimal>,
    pub category_hint: String,
    pub typology: Option<String>,
    pub creation_date: Option<NaiveDate>,
    /// Date printed on the proposal sent to the client.
    pub proposal_date: Option<NaiveDate>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub signature_date: Option<NaiveDate>,
    pub status: ProposalStatus,
    /// Sales owner responsible for follow-up.
    pub owner: Option<String>,
}

impl Proposal {
    pub fn new(id: impl Into<String>, title: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: ProposalId(id.into()),
            title: title.into(),
            amount,
            probability_percent: None,
            category_hint: String::new(),
            typology: None,
            creation_date: None,
            proposal_date: None,
            start_date: None,
            end_date: None,
            signature_date: None,
            status: ProposalStatus::Pending,
            owner: None,
        }
    }

    /// Year the deal counts as signed: signature date, else creation date.
    pub fn signing_year(&self) -> Option<i32> {
        self.signature_date.or(self.creation_date).map(|date| date.year())
    }

    pub fn has_raw_date_inversion(&self) -> bool {
        matches!((self.start_date, self.end_date), (Some(start), Some(end)) if start > end)
    }
}
