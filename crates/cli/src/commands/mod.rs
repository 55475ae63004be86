pub mod allocate;
pub mod config;
pub mod diagnose;
pub mod followup;
pub mod input;
pub mod projection;
pub mod reconcile;
pub mod views;

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use spreadline_core::config::{ConfigOverrides, EngineConfig, LoadOptions};

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loads the engine configuration or produces the command's config failure.
pub(crate) fn load_config(
    command: &str,
    config_path: Option<PathBuf>,
    overrides: ConfigOverrides,
) -> Result<EngineConfig, CommandResult> {
    EngineConfig::load(LoadOptions { config_path, require_file: false, overrides }).map_err(
        |error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            )
        },
    )
}

pub(crate) fn input_failure(command: &str, error: &anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), EXIT_INPUT)
}

pub(crate) fn to_data<T: Serialize>(command: &str, value: &T) -> Result<Value, CommandResult> {
    serde_json::to_value(value).map_err(|error| {
        CommandResult::failure(command, "serialization", error.to_string(), 1)
    })
}
