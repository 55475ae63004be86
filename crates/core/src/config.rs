use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::accounting::{AccountingCalendar, DEFAULT_MERGE_MONTH};
use crate::allocation::BandThresholds;
use crate::horizon::{Horizon, DEFAULT_HORIZON_YEARS, MAX_HORIZON_YEARS};

/// Immutable engine configuration threaded through every entry point.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub horizon: HorizonConfig,
    pub design: BandThresholds,
    pub keywords: KeywordConfig,
    pub accounting: AccountingConfig,
    pub status: StatusConfig,
    pub diagnostics: DiagnosticsConfig,
    pub projection: ProjectionConfig,
    pub followup: FollowupConfig,
    pub logging: LoggingConfig,
}

/// Longest look-ahead any date window may use.
pub const MAX_WINDOW_DAYS: i64 = 3_650;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HorizonConfig {
    /// `None` means the year of the run date.
    pub first_year: Option<i32>,
    pub years: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordConfig {
    pub maintenance: Vec<String>,
    pub works: Vec<String>,
    pub design: Vec<String>,
    /// Hint values that mean "no category given".
    pub placeholders: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountingConfig {
    /// First month of the merged pair; the pair is `(merge_month, merge_month + 1)`.
    pub merge_month: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusConfig {
    pub won: Vec<String>,
    pub pending: Vec<String>,
    pub lost: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticsConfig {
    pub amount_threshold: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectionConfig {
    pub probability_threshold: Decimal,
    pub start_window_days: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FollowupConfig {
    pub days_forward: i64,
    /// Per-owner look-ahead replacing `days_forward`.
    pub days_forward_by_owner: BTreeMap<String, i64>,
}

impl FollowupConfig {
    pub fn days_forward_for(&self, owner: &str) -> i64 {
        self.days_forward_by_owner.get(owner).copied().unwrap_or(self.days_forward)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub horizon_first_year: Option<i32>,
    pub horizon_years: Option<u32>,
    pub merge_month: Option<u32>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

fn words(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            horizon: HorizonConfig { first_year: None, years: DEFAULT_HORIZON_YEARS },
            design: BandThresholds::default(),
            keywords: KeywordConfig {
                maintenance: words(&["MAINTENANCE", "UPKEEP"]),
                works: words(&["WORKS", "CONSTRUCTION"]),
                design: words(&["DESIGN", "STUDY"]),
                placeholders: words(&["UNDEFINED", "NOT DEFINED", "N/A"]),
            },
            accounting: AccountingConfig { merge_month: DEFAULT_MERGE_MONTH },
            status: StatusConfig {
                won: words(&["won", "signed", "won and finished", "won in progress"]),
                pending: words(&["brief", "in progress", "sent", "sent awaiting reply"]),
                lost: words(&["lost", "declined", "refused"]),
            },
            diagnostics: DiagnosticsConfig { amount_threshold: Decimal::new(1_000, 0) },
            projection: ProjectionConfig {
                probability_threshold: Decimal::new(50, 0),
                start_window_days: 120,
            },
            followup: FollowupConfig { days_forward: 60, days_forward_by_owner: BTreeMap::new() },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl EngineConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from("spreadline.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Tracked horizon for a run happening on `today`.
    pub fn horizon(&self, today: NaiveDate) -> Horizon {
        Horizon::starting_at(self.horizon.first_year.unwrap_or(today.year()), self.horizon.years)
    }

    pub fn accounting_calendar(&self) -> AccountingCalendar {
        AccountingCalendar::new(self.accounting.merge_month).unwrap_or_default()
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(horizon) = patch.horizon {
            if let Some(first_year) = horizon.first_year {
                self.horizon.first_year = Some(first_year);
            }
            if let Some(years) = horizon.years {
                self.horizon.years = years;
            }
        }

        if let Some(design) = patch.design {
            if let Some(low) = design.low_threshold {
                self.design.low = low;
            }
            if let Some(high) = design.high_threshold {
                self.design.high = high;
            }
        }

        if let Some(keywords) = patch.keywords {
            if let Some(maintenance) = keywords.maintenance {
                self.keywords.maintenance = maintenance;
            }
            if let Some(works) = keywords.works {
                self.keywords.works = works;
            }
            if let Some(design) = keywords.design {
                self.keywords.design = design;
            }
            if let Some(placeholders) = keywords.placeholders {
                self.keywords.placeholders = placeholders;
            }
        }

        if let Some(accounting) = patch.accounting {
            if let Some(merge_month) = accounting.merge_month {
                self.accounting.merge_month = merge_month;
            }
        }

        if let Some(status) = patch.status {
            if let Some(won) = status.won {
                self.status.won = won;
            }
            if let Some(pending) = status.pending {
                self.status.pending = pending;
            }
            if let Some(lost) = status.lost {
                self.status.lost = lost;
            }
        }

        if let Some(diagnostics) = patch.diagnostics {
            if let Some(amount_threshold) = diagnostics.amount_threshold {
                self.diagnostics.amount_threshold = amount_threshold;
            }
        }

        if let Some(projection) = patch.projection {
            if let Some(probability_threshold) = projection.probability_threshold {
                self.projection.probability_threshold = probability_threshold;
            }
            if let Some(start_window_days) = projection.start_window_days {
                self.projection.start_window_days = start_window_days;
            }
        }

        if let Some(followup) = patch.followup {
            if let Some(days_forward) = followup.days_forward {
                self.followup.days_forward = days_forward;
            }
            if let Some(owners) = followup.owners {
                self.followup.days_forward_by_owner = owners;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SPREADLINE_HORIZON_FIRST_YEAR") {
            self.horizon.first_year = Some(parse_env("SPREADLINE_HORIZON_FIRST_YEAR", &value)?);
        }
        if let Some(value) = read_env("SPREADLINE_HORIZON_YEARS") {
            self.horizon.years = parse_env("SPREADLINE_HORIZON_YEARS", &value)?;
        }

        if let Some(value) = read_env("SPREADLINE_DESIGN_LOW_THRESHOLD") {
            self.design.low = parse_env("SPREADLINE_DESIGN_LOW_THRESHOLD", &value)?;
        }
        if let Some(value) = read_env("SPREADLINE_DESIGN_HIGH_THRESHOLD") {
            self.design.high = parse_env("SPREADLINE_DESIGN_HIGH_THRESHOLD", &value)?;
        }

        if let Some(value) = read_env("SPREADLINE_ACCOUNTING_MERGE_MONTH") {
            self.accounting.merge_month = parse_env("SPREADLINE_ACCOUNTING_MERGE_MONTH", &value)?;
        }

        if let Some(value) = read_env("SPREADLINE_FOLLOWUP_DAYS_FORWARD") {
            self.followup.days_forward = parse_env("SPREADLINE_FOLLOWUP_DAYS_FORWARD", &value)?;
        }

        let log_level =
            read_env("SPREADLINE_LOGGING_LEVEL").or_else(|| read_env("SPREADLINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SPREADLINE_LOGGING_FORMAT").or_else(|| read_env("SPREADLINE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(first_year) = overrides.horizon_first_year {
            self.horizon.first_year = Some(first_year);
        }
        if let Some(years) = overrides.horizon_years {
            self.horizon.years = years;
        }
        if let Some(merge_month) = overrides.merge_month {
            self.accounting.merge_month = merge_month;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_horizon(&self.horizon)?;
        validate_design(&self.design)?;
        validate_keywords(&self.keywords)?;
        validate_accounting(&self.accounting)?;
        validate_projection(&self.projection)?;
        validate_followup(&self.followup)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("spreadline.toml"), PathBuf::from("config/spreadline.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_horizon(horizon: &HorizonConfig) -> Result<(), ConfigError> {
    if horizon.years == 0 || horizon.years > MAX_HORIZON_YEARS {
        return Err(ConfigError::Validation(format!(
            "horizon.years must be in range 1..={MAX_HORIZON_YEARS}"
        )));
    }

    if let Some(first_year) = horizon.first_year {
        if !(1900..=9999).contains(&first_year) {
            return Err(ConfigError::Validation(
                "horizon.first_year must be a four-digit calendar year".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_design(design: &BandThresholds) -> Result<(), ConfigError> {
    if design.low < Decimal::ZERO {
        return Err(ConfigError::Validation(
            "design.low_threshold must not be negative".to_string(),
        ));
    }

    if design.low >= design.high {
        return Err(ConfigError::Validation(
            "design.low_threshold must be lower than design.high_threshold".to_string(),
        ));
    }

    Ok(())
}

fn validate_keywords(keywords: &KeywordConfig) -> Result<(), ConfigError> {
    let lists = [
        ("keywords.maintenance", &keywords.maintenance),
        ("keywords.works", &keywords.works),
        ("keywords.design", &keywords.design),
    ];

    for (key, list) in lists {
        if list.iter().all(|keyword| keyword.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{key} must contain at least one non-empty keyword"
            )));
        }
    }

    Ok(())
}

fn validate_accounting(accounting: &AccountingConfig) -> Result<(), ConfigError> {
    if AccountingCalendar::new(accounting.merge_month).is_none() {
        return Err(ConfigError::Validation(
            "accounting.merge_month must be in range 1..=11".to_string(),
        ));
    }

    Ok(())
}

fn validate_projection(projection: &ProjectionConfig) -> Result<(), ConfigError> {
    let hundred = Decimal::ONE_HUNDRED;
    if projection.probability_threshold < Decimal::ZERO || projection.probability_threshold > hundred
    {
        return Err(ConfigError::Validation(
            "projection.probability_threshold must be in range 0..=100".to_string(),
        ));
    }

    validate_window("projection.start_window_days", projection.start_window_days)
}

fn validate_followup(followup: &FollowupConfig) -> Result<(), ConfigError> {
    validate_window("followup.days_forward", followup.days_forward)?;
    for (owner, days) in &followup.days_forward_by_owner {
        validate_window(&format!("followup.owners.{owner}"), *days)?;
    }
    Ok(())
}

fn validate_window(key: &str, days: i64) -> Result<(), ConfigError> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(ConfigError::Validation(format!(
            "{key} must be in range 1..={MAX_WINDOW_DAYS} days"
        )));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    horizon: Option<HorizonPatch>,
    design: Option<DesignPatch>,
    keywords: Option<KeywordsPatch>,
    accounting: Option<AccountingPatch>,
    status: Option<StatusPatch>,
    diagnostics: Option<DiagnosticsPatch>,
    projection: Option<ProjectionPatch>,
    followup: Option<FollowupPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct HorizonPatch {
    first_year: Option<i32>,
    years: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DesignPatch {
    low_threshold: Option<Decimal>,
    high_threshold: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct KeywordsPatch {
    maintenance: Option<Vec<String>>,
    works: Option<Vec<String>>,
    design: Option<Vec<String>>,
    placeholders: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct AccountingPatch {
    merge_month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StatusPatch {
    won: Option<Vec<String>>,
    pending: Option<Vec<String>>,
    lost: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct DiagnosticsPatch {
    amount_threshold: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct ProjectionPatch {
    probability_threshold: Option<Decimal>,
    start_window_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct FollowupPatch {
    days_forward: Option<i64>,
    owners: Option<BTreeMap<String, i64>>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
