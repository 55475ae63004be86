use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use spreadline_core::config::{EngineConfig, LoadOptions};
use toml::Value;

/// Renders every effective setting with the layer it came from.
pub fn run(config_path: Option<PathBuf>) -> Result<String, String> {
    let config = match EngineConfig::load(LoadOptions {
        config_path: config_path.clone(),
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => return Err(format!("config validation failed: {error}")),
    };

    let config_file_path = detect_config_path(config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let first_year = config
        .horizon
        .first_year
        .map(|year| year.to_string())
        .unwrap_or_else(|| "<current year>".to_string());

    let owner_windows = config
        .followup
        .days_forward_by_owner
        .iter()
        .map(|(owner, days)| format!("{owner}={days}"))
        .collect::<Vec<_>>()
        .join(", ");

    let entries = [
        (
            "horizon.first_year",
            first_year,
            source("horizon.first_year", &["SPREADLINE_HORIZON_FIRST_YEAR"]),
        ),
        (
            "horizon.years",
            config.horizon.years.to_string(),
            source("horizon.years", &["SPREADLINE_HORIZON_YEARS"]),
        ),
        (
            "design.low_threshold",
            config.design.low.to_string(),
            source("design.low_threshold", &["SPREADLINE_DESIGN_LOW_THRESHOLD"]),
        ),
        (
            "design.high_threshold",
            config.design.high.to_string(),
            source("design.high_threshold", &["SPREADLINE_DESIGN_HIGH_THRESHOLD"]),
        ),
        (
            "keywords.maintenance",
            config.keywords.maintenance.join(", "),
            source("keywords.maintenance", &[]),
        ),
        ("keywords.works", config.keywords.works.join(", "), source("keywords.works", &[])),
        ("keywords.design", config.keywords.design.join(", "), source("keywords.design", &[])),
        (
            "keywords.placeholders",
            config.keywords.placeholders.join(", "),
            source("keywords.placeholders", &[]),
        ),
        (
            "accounting.merge_month",
            format!(
                "{} ({})",
                config.accounting.merge_month,
                config.accounting_calendar().label(config.accounting.merge_month as usize - 1)
            ),
            source("accounting.merge_month", &["SPREADLINE_ACCOUNTING_MERGE_MONTH"]),
        ),
        ("status.won", config.status.won.join(", "), source("status.won", &[])),
        ("status.pending", config.status.pending.join(", "), source("status.pending", &[])),
        ("status.lost", config.status.lost.join(", "), source("status.lost", &[])),
        (
            "diagnostics.amount_threshold",
            config.diagnostics.amount_threshold.to_string(),
            source("diagnostics.amount_threshold", &[]),
        ),
        (
            "projection.probability_threshold",
            config.projection.probability_threshold.to_string(),
            source("projection.probability_threshold", &[]),
        ),
        (
            "projection.start_window_days",
            config.projection.start_window_days.to_string(),
            source("projection.start_window_days", &[]),
        ),
        (
            "followup.days_forward",
            config.followup.days_forward.to_string(),
            source("followup.days_forward", &["SPREADLINE_FOLLOWUP_DAYS_FORWARD"]),
        ),
        (
            "followup.owners",
            owner_windows,
            source("followup.owners", &[]),
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            source("logging.level", &["SPREADLINE_LOGGING_LEVEL", "SPREADLINE_LOG_LEVEL"]),
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            source("logging.format", &["SPREADLINE_LOGGING_FORMAT", "SPREADLINE_LOG_FORMAT"]),
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.into_iter().map(|(key, value, source)| render_line(key, &value, source)));
    Ok(lines.join("\n"))
}

fn detect_config_path(explicit: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then_some(path);
    }

    let root = PathBuf::from("spreadline.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/spreadline.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}
