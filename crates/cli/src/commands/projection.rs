use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use spreadline_core::config::ConfigOverrides;
use spreadline_core::engine::Engine;
use spreadline_core::projection::{project_works, ProjectedWorks};

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult};

const COMMAND: &str = "projection";

#[derive(Debug, Serialize)]
struct ProjectionReport {
    window_start: NaiveDate,
    window_days: i64,
    total_amount: Decimal,
    proposals: Vec<ProjectedWorks>,
}

pub fn run(input: &Path, config_path: Option<PathBuf>, today: NaiveDate) -> CommandResult {
    let config = match load_config(COMMAND, config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let engine = Engine::from_config(config, today);

    let proposals = match read_proposals(input, &engine) {
        Ok(proposals) => proposals,
        Err(error) => return input_failure(COMMAND, &error),
    };

    let settings = &engine.config().projection;
    let projected =
        project_works(&proposals, today, settings, |proposal| engine.classify(proposal));
    let report = ProjectionReport {
        window_start: today,
        window_days: settings.start_window_days,
        total_amount: projected.iter().map(|row| row.amount).sum(),
        proposals: projected,
    };

    let message = format!(
        "{} works proposals projected to sign within {} days",
        report.proposals.len(),
        report.window_days
    );
    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
