use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tender_core::config::AppConfig;
use toml::Value;

use crate::commands::DataSource;

pub fn run(data_source: &DataSource) -> String {
    let config = match AppConfig::load(data_source.load_options()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let overrides = &data_source.overrides;
    let config_file_path = data_source.config_path.clone().or_else(detect_config_path);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str], flagged: bool| {
        if flagged {
            return "flag".to_string();
        }
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: flag > env > file > default):".to_string()];

    lines.push(render_line(
        "gathering.timeout_ms",
        &config.gathering.timeout_ms.to_string(),
        source(
            "gathering.timeout_ms",
            &["TENDER_GATHERING_TIMEOUT_MS"],
            overrides.gathering_timeout_ms.is_some(),
        ),
    ));
    lines.push(render_line(
        "gathering.max_page_size",
        &config.gathering.max_page_size.to_string(),
        source("gathering.max_page_size", &["TENDER_GATHERING_MAX_PAGE_SIZE"], false),
    ));
    lines.push(render_line(
        "report.high_freight_threshold_pct",
        &config.report.high_freight_threshold_pct.to_string(),
        source(
            "report.high_freight_threshold_pct",
            &["TENDER_REPORT_HIGH_FREIGHT_THRESHOLD_PCT"],
            overrides.high_freight_threshold_pct.is_some(),
        ),
    ));
    lines.push(render_line(
        "report.material_placeholder",
        &config.report.material_placeholder,
        source("report.material_placeholder", &["TENDER_REPORT_MATERIAL_PLACEHOLDER"], false),
    ));
    lines.push(render_line(
        "report.supplier_placeholder",
        &config.report.supplier_placeholder,
        source("report.supplier_placeholder", &["TENDER_REPORT_SUPPLIER_PLACEHOLDER"], false),
    ));
    lines.push(render_line(
        "logging.level",
        &config.logging.level,
        source(
            "logging.level",
            &["TENDER_LOGGING_LEVEL", "TENDER_LOG_LEVEL"],
            overrides.log_level.is_some(),
        ),
    ));
    lines.push(render_line(
        "logging.format",
        &format!("{:?}", config.logging.format),
        source(
            "logging.format",
            &["TENDER_LOGGING_FORMAT", "TENDER_LOG_FORMAT"],
            overrides.log_format.is_some(),
        ),
    ));

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    ["tender.toml", "config/tender.toml"].into_iter().map(PathBuf::from).find(|path| path.exists())
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

#[cfg(test)]
mod tests {
    use toml::Value;

    use super::{contains_path, field_source};

    #[test]
    fn nested_keys_are_found_in_the_file_document() {
        let doc: Value = "[report]\nhigh_freight_threshold_pct = 35\n".parse().expect("toml");

        assert!(contains_path(&doc, "report.high_freight_threshold_pct"));
        assert!(!contains_path(&doc, "report.material_placeholder"));
        assert!(!contains_path(&doc, "gathering.timeout_ms"));
    }

    #[test]
    fn file_values_are_attributed_to_the_file() {
        let doc: Value = "[gathering]\ntimeout_ms = 900\n".parse().expect("toml");

        let source = field_source(
            "gathering.timeout_ms",
            &["TENDER_TEST_UNSET_TIMEOUT"],
            Some(&doc),
            Some(std::path::Path::new("tender.toml")),
        );
        assert_eq!(source, "file (tender.toml)");

        let fallback =
            field_source("gathering.max_page_size", &["TENDER_TEST_UNSET_PAGE"], Some(&doc), None);
        assert_eq!(fallback, "default");
    }
}
