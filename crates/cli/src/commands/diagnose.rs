use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use spreadline_core::config::ConfigOverrides;
use spreadline_core::diagnostics::diagnose;
use spreadline_core::engine::Engine;

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult};

const COMMAND: &str = "diagnose";

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

    let report = diagnose(&proposals, engine.config().diagnostics.amount_threshold);
    let message = format!("{} of {} proposals flagged", report.len(), proposals.len());
    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
