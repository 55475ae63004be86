use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-proposal failure. The batch skips the proposal and reports it.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationError {
    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("creation date is missing, nothing to anchor the project dates on")]
    UnresolvableDates,
}

impl AllocationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::InvalidDateRange { .. } => "invalid_date_range",
            Self::UnresolvableDates => "unresolvable_dates",
        }
    }
}
