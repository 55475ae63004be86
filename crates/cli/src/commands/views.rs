use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use spreadline_core::config::ConfigOverrides;
use spreadline_core::engine::Engine;
use spreadline_core::views::monthly_views;

use crate::commands::input::read_proposals;
use crate::commands::{input_failure, load_config, to_data, CommandResult};

const COMMAND: &str = "views";

/// Snapshot, sent-this-month and won-this-month views for the month of `today`.
/// The horizon starts on `today`'s year unless configured otherwise.
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

    let outcome = engine.run(&proposals);
    let views = monthly_views(&outcome.records, today);

    let message = format!(
        "{} pending, {} sent and {} won in {}",
        views.snapshot.count(),
        views.sent_month.count(),
        views.won_month.count(),
        views.snapshot.month
    );
    match to_data(COMMAND, &views) {
        Ok(data) => CommandResult::success_with_data(COMMAND, message, Some(data)),
        Err(failure) => failure,
    }
}
