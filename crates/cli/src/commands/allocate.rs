use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Map;
use spreadline_core::aggregate::{aggregate_portfolio, PeriodAggregate};
use spreadline_core::allocation::round_money;
use spreadline_core::config::ConfigOverrides;
use spreadline_core::engine::{BatchOutcome, Engine, ProposalFailure, ProposalRecord};
use spreadline_core::{DateRule, ProposalId, SpreadShape};

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult};

const COMMAND: &str = "allocate";

#[derive(Debug, Clone, Default)]
pub struct AllocateArgs {
    pub input: PathBuf,
    pub first_year: Option<i32>,
    pub years: Option<u32>,
}

#[derive(Debug, Serialize)]
struct AllocationReport {
    run_id: String,
    first_year: i32,
    last_year: i32,
    proposals: Vec<ProposalReport>,
    failures: Vec<FailureReport>,
    portfolio: Vec<PeriodAggregate>,
}

#[derive(Debug, Serialize)]
struct ProposalReport {
    proposal_id: ProposalId,
    title: String,
    category: String,
    rule_applied: DateRule,
    one_month_fallback: bool,
    shape: SpreadShape,
    signing_year: i32,
    primary_typology: Option<String>,
    fields: Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct FailureReport {
    proposal_id: ProposalId,
    title: String,
    error_class: &'static str,
    message: String,
}

pub fn run(args: &AllocateArgs, config_path: Option<PathBuf>, today: NaiveDate) -> CommandResult {
    let overrides = ConfigOverrides {
        horizon_first_year: args.first_year,
        horizon_years: args.years,
        ..ConfigOverrides::default()
    };
    let config = match load_config(COMMAND, config_path, overrides) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let engine = Engine::from_config(config, today);
    let outcome = match allocate_file(&args.input, &engine) {
        Ok(outcome) => outcome,
        Err(error) => return input_failure(COMMAND, &error),
    };

    let portfolio = aggregate_portfolio(&outcome.records, &engine.config().accounting_calendar());
    let report = AllocationReport {
        run_id: outcome.run_id.to_string(),
        first_year: outcome.horizon.first_year(),
        last_year: outcome.horizon.last_year(),
        proposals: outcome.records.iter().map(proposal_report).collect(),
        failures: outcome.failures.iter().map(failure_report).collect(),
        portfolio,
    };

    let message = format!(
        "allocated {} proposals, excluded {}",
        report.proposals.len(),
        report.failures.len()
    );
    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}

fn allocate_file(path: &Path, engine: &Engine) -> anyhow::Result<BatchOutcome> {
    let proposals = read_proposals(path, engine)?;
    Ok(engine.run(&proposals))
}

fn proposal_report(record: &ProposalRecord) -> ProposalReport {
    let fields = record
        .revenue
        .fields()
        .into_iter()
        .map(|(name, value)| (name, money(value)))
        .collect();

    ProposalReport {
        proposal_id: record.proposal_id.clone(),
        title: record.title.clone(),
        category: record.category.label().to_string(),
        rule_applied: record.dates.rule_applied,
        one_month_fallback: record.dates.one_month_fallback,
        shape: record.shape,
        signing_year: record.signing_year,
        primary_typology: record.primary_typology.clone(),
        fields,
    }
}

fn failure_report(failure: &ProposalFailure) -> FailureReport {
    FailureReport {
        proposal_id: failure.proposal_id.clone(),
        title: failure.title.clone(),
        error_class: failure.error.error_class(),
        message: failure.error.to_string(),
    }
}

/// Fields go out as fixed two-decimal strings, rounded rather than cut.
pub(crate) fn money(value: Decimal) -> serde_json::Value {
    serde_json::Value::String(format!("{:.2}", round_money(value)))
}
