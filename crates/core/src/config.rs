use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, Default, Serialize)]
pub struct AppConfig {
    pub gathering: GatheringConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct GatheringConfig {
    pub timeout_ms: u64,
    pub max_page_size: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportConfig {
    pub high_freight_threshold_pct: u32,
    pub material_placeholder: String,
    pub supplier_placeholder: String,
}

#[derive(Clone, Debug, Serialize)]
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
    pub gathering_timeout_ms: Option<u64>,
    pub high_freight_threshold_pct: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
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

impl Default for GatheringConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000, max_page_size: 1_000 }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            high_freight_threshold_pct: 20,
            material_placeholder: "Material not found".to_string(),
            supplier_placeholder: "Supplier not found".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: LogFormat::Compact }
    }
}

impl std::str::FromStr for LogFormat {
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("tender.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gathering) = patch.gathering {
            if let Some(timeout_ms) = gathering.timeout_ms {
                self.gathering.timeout_ms = timeout_ms;
            }
            if let Some(max_page_size) = gathering.max_page_size {
                self.gathering.max_page_size = max_page_size;
            }
        }

        if let Some(report) = patch.report {
            if let Some(threshold) = report.high_freight_threshold_pct {
                self.report.high_freight_threshold_pct = threshold;
            }
            if let Some(placeholder) = report.material_placeholder {
                self.report.material_placeholder = placeholder;
            }
            if let Some(placeholder) = report.supplier_placeholder {
                self.report.supplier_placeholder = placeholder;
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
        if let Some(value) = read_env("TENDER_GATHERING_TIMEOUT_MS") {
            self.gathering.timeout_ms = parse_u64("TENDER_GATHERING_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = read_env("TENDER_GATHERING_MAX_PAGE_SIZE") {
            self.gathering.max_page_size = parse_u32("TENDER_GATHERING_MAX_PAGE_SIZE", &value)?;
        }

        if let Some(value) = read_env("TENDER_REPORT_HIGH_FREIGHT_THRESHOLD_PCT") {
            self.report.high_freight_threshold_pct =
                parse_u32("TENDER_REPORT_HIGH_FREIGHT_THRESHOLD_PCT", &value)?;
        }
        if let Some(value) = read_env("TENDER_REPORT_MATERIAL_PLACEHOLDER") {
            self.report.material_placeholder = value;
        }
        if let Some(value) = read_env("TENDER_REPORT_SUPPLIER_PLACEHOLDER") {
            self.report.supplier_placeholder = value;
        }

        let log_level = read_env("TENDER_LOGGING_LEVEL").or_else(|| read_env("TENDER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("TENDER_LOGGING_FORMAT").or_else(|| read_env("TENDER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(timeout_ms) = overrides.gathering_timeout_ms {
            self.gathering.timeout_ms = timeout_ms;
        }
        if let Some(threshold) = overrides.high_freight_threshold_pct {
            self.report.high_freight_threshold_pct = threshold;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gathering(&self.gathering)?;
        validate_report(&self.report)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("tender.toml"), PathBuf::from("config/tender.toml")]
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

fn validate_gathering(gathering: &GatheringConfig) -> Result<(), ConfigError> {
    if gathering.timeout_ms == 0 || gathering.timeout_ms > 120_000 {
        return Err(ConfigError::Validation(
            "gathering.timeout_ms must be in range 1..=120000".to_string(),
        ));
    }

    if gathering.max_page_size == 0 {
        return Err(ConfigError::Validation(
            "gathering.max_page_size must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_report(report: &ReportConfig) -> Result<(), ConfigError> {
    if report.high_freight_threshold_pct > 100 {
        return Err(ConfigError::Validation(
            "report.high_freight_threshold_pct must be in range 0..=100".to_string(),
        ));
    }

    if report.material_placeholder.trim().is_empty() {
        return Err(ConfigError::Validation(
            "report.material_placeholder must not be empty".to_string(),
        ));
    }

    if report.supplier_placeholder.trim().is_empty() {
        return Err(ConfigError::Validation(
            "report.supplier_placeholder must not be empty".to_string(),
        ));
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gathering: Option<GatheringPatch>,
    report: Option<ReportPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GatheringPatch {
    timeout_ms: Option<u64>,
    max_page_size: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ReportPatch {
    high_freight_threshold_pct: Option<u32>,
    material_placeholder: Option<String>,
    supplier_placeholder: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_are_valid() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| err.to_string())?;

        ensure(config.gathering.timeout_ms == 5_000, "default timeout should be 5s")?;
        ensure(config.report.high_freight_threshold_pct == 20, "default threshold should be 20%")?;
        ensure(
            config.report.material_placeholder == "Material not found",
            "default material placeholder",
        )?;
        ensure(matches!(config.logging.format, LogFormat::Compact), "default format is compact")
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_TENDER_PLACEHOLDER", "Unknown material");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tender.toml");
            fs::write(
                &path,
                r#"
[report]
material_placeholder = "${TEST_TENDER_PLACEHOLDER}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.report.material_placeholder == "Unknown material",
                "placeholder should be loaded from environment",
            )
        })();

        clear_vars(&["TEST_TENDER_PLACEHOLDER"]);
        result
    }

    #[test]
    fn missing_interpolation_variable_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(&["TEST_TENDER_UNSET"]);

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("tender.toml");
        fs::write(&path, "[logging]\nlevel = \"${TEST_TENDER_UNSET}\"\n")
            .map_err(|err| err.to_string())?;

        let error = match AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() }) {
            Ok(_) => return Err("expected interpolation failure".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_TENDER_UNSET"),
            "error should name the missing variable",
        )
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TENDER_LOG_LEVEL", "warn");
        env::set_var("TENDER_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )
        })();

        clear_vars(&["TENDER_LOG_LEVEL", "TENDER_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TENDER_GATHERING_TIMEOUT_MS", "2500");
        env::set_var("TENDER_REPORT_HIGH_FREIGHT_THRESHOLD_PCT", "30");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("tender.toml");
            fs::write(
                &path,
                r#"
[gathering]
timeout_ms = 1000
max_page_size = 250

[report]
high_freight_threshold_pct = 15

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    high_freight_threshold_pct: Some(40),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.gathering.max_page_size == 250, "file page size should apply")?;
            ensure(config.gathering.timeout_ms == 2500, "env timeout should win over file")?;
            ensure(
                config.report.high_freight_threshold_pct == 40,
                "override threshold should win over env",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")
        })();

        clear_vars(&["TENDER_GATHERING_TIMEOUT_MS", "TENDER_REPORT_HIGH_FREIGHT_THRESHOLD_PCT"]);
        result
    }

    #[test]
    fn invalid_env_override_names_the_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TENDER_GATHERING_TIMEOUT_MS", "soon");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected env override failure".to_string()),
                Err(error) => error,
            };
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. } if key == "TENDER_GATHERING_TIMEOUT_MS"
                ),
                "error should name the offending variable",
            )
        })();

        clear_vars(&["TENDER_GATHERING_TIMEOUT_MS"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let error = match AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                high_freight_threshold_pct: Some(150),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected validation failure but config load succeeded".to_string()),
            Err(error) => error,
        };
        let has_message = matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("high_freight_threshold_pct")
        );
        ensure(has_message, "validation failure should mention the threshold")
    }

    #[test]
    fn required_file_must_exist() -> Result<(), String> {
        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let missing = dir.path().join("absent.toml");

        let error = match AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            ..LoadOptions::default()
        }) {
            Ok(_) => return Err("expected missing file error".to_string()),
            Err(error) => error,
        };
        ensure(
            matches!(error, ConfigError::MissingConfigFile(ref path) if path == &missing),
            "error should carry the expected path",
        )
    }
}
