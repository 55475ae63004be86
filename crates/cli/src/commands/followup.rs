use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use spreadline_core::config::ConfigOverrides;
use spreadline_core::engine::Engine;
use spreadline_core::followup::{followup_window_start, select_followups, FollowupCandidate};

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult};

const COMMAND: &str = "followup";

#[derive(Debug, Serialize)]
struct FollowupReport {
    window_start: NaiveDate,
    days_forward: i64,
    owners: BTreeMap<String, Vec<FollowupCandidate>>,
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

    let settings = &engine.config().followup;
    let owners =
        select_followups(&proposals, today, settings, |proposal| engine.classify(proposal));
    let report = FollowupReport {
        window_start: followup_window_start(today),
        days_forward: settings.days_forward,
        owners,
    };

    let total: usize = report.owners.values().map(Vec::len).sum();
    let message =
        format!("{total} proposals to follow up across {} owners", report.owners.len());
    match to_data(COMMAND, &report) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
