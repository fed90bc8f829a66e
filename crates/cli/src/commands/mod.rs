pub mod available;
pub mod config;
pub mod draft;
pub mod report;
pub mod smoke;

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tender_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use tender_core::errors::ApplicationError;
use tender_db::{Dataset, InMemoryStore, QuotationGatherer};

pub const EXIT_RUNTIME: u8 = 1;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_DATASET: u8 = 3;
pub const EXIT_NOT_FOUND: u8 = 4;
pub const EXIT_CONFLICT: u8 = 5;

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
}

#[derive(Debug, Serialize)]
struct CommandPayload<'a, T> {
    command: &'a str,
    status: &'static str,
    data: &'a T,
}

impl CommandResult {
    pub fn data<T: Serialize>(command: &str, data: &T) -> Self {
        Self::with_data(command, "ok", data, 0)
    }

    /// The request was understood but its content breaks a business rule.
    pub fn rejected<T: Serialize>(command: &str, data: &T) -> Self {
        Self::with_data(command, "rejected", data, EXIT_CONFLICT)
    }

    fn with_data<T: Serialize>(command: &str, status: &'static str, data: &T, exit_code: u8) -> Self {
        match serde_json::to_string(&CommandPayload { command, status, data }) {
            Ok(output) => Self { exit_code, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), EXIT_RUNTIME),
        }
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
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    pub fn from_application_error(command: &str, error: ApplicationError) -> Self {
        let detail = error.to_string();
        let (error_class, exit_code) = match &error {
            ApplicationError::Domain(_) => ("selection_conflict", EXIT_CONFLICT),
            ApplicationError::QuotationNotFound { .. } => ("not_found", EXIT_NOT_FOUND),
            ApplicationError::Gathering(_) => ("gathering", EXIT_DATASET),
            ApplicationError::Configuration(_) => ("config_validation", EXIT_CONFIG),
        };
        let interface = error.into_interface(correlation_id(command));

        Self::failure(
            command,
            error_class,
            format!("{} ({detail})", interface.user_message()),
            exit_code,
        )
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

pub fn correlation_id(command: &str) -> String {
    format!("cli-{command}")
}

pub fn load_config(command: &str, source: &DataSource) -> Result<AppConfig, CommandResult> {
    AppConfig::load(source.load_options()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

/// Reads a dataset export, or the bundled seed when no path is given.
pub fn load_dataset(command: &str, path: Option<&Path>) -> Result<Dataset, CommandResult> {
    let dataset = match path {
        Some(path) => fs::read_to_string(path)
            .map_err(|error| format!("could not read `{}`: {error}", path.display()))
            .and_then(|raw| Dataset::from_json(&raw).map_err(|error| error.to_string())),
        None => Dataset::seed().map_err(|error| error.to_string()),
    };

    dataset.map_err(|message| CommandResult::failure(command, "dataset", message, EXIT_DATASET))
}

pub fn gatherer(config: &AppConfig, dataset: Dataset) -> QuotationGatherer {
    QuotationGatherer::from_store(Arc::new(InMemoryStore::new(dataset)))
        .with_settings(&config.gathering)
}

pub fn block_on<F: Future>(command: &str, future: F) -> Result<F::Output, CommandResult> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(
        |error| {
            CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            )
        },
    )?;
    Ok(runtime.block_on(future))
}

/// Options shared by every command that reads configuration or purchasing data.
#[derive(Debug, Clone, Default)]
pub struct DataSource {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub dataset: Option<PathBuf>,
}

impl DataSource {
    /// An explicit `--config` path must exist; otherwise the default
    /// locations are probed.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: self.overrides.clone(),
        }
    }
}
