use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::ExposeSecret;
use toml::Value;
use vlog_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};

struct ConfigFile {
    path: Option<PathBuf>,
    doc: Option<Value>,
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let path = detect_config_path();
    let file = ConfigFile { doc: load_config_file_doc(path.as_deref()), path };
    let api_key = config
        .classifier
        .api_key
        .as_ref()
        .map(|key| redact_key(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());

    let entries: [(&str, String, &[&str]); 13] = [
        ("database.url", config.database.url.clone(), &["VLOG_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["VLOG_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["VLOG_DATABASE_TIMEOUT_SECS"],
        ),
        ("classifier.enabled", config.classifier.enabled.to_string(), &["VLOG_CLASSIFIER_ENABLED"]),
        ("classifier.api_key", api_key, &["VLOG_CLASSIFIER_API_KEY", "HUGGINGFACE_API_KEY"]),
        ("classifier.base_url", config.classifier.base_url.clone(), &["VLOG_CLASSIFIER_BASE_URL"]),
        (
            "classifier.ner_model",
            config.classifier.ner_model.clone(),
            &["VLOG_CLASSIFIER_NER_MODEL"],
        ),
        (
            "classifier.generation_model",
            config.classifier.generation_model.clone(),
            &["VLOG_CLASSIFIER_GENERATION_MODEL"],
        ),
        (
            "classifier.zero_shot_model",
            config.classifier.zero_shot_model.clone(),
            &["VLOG_CLASSIFIER_ZERO_SHOT_MODEL"],
        ),
        (
            "classifier.timeout_secs",
            config.classifier.timeout_secs.to_string(),
            &["VLOG_CLASSIFIER_TIMEOUT_SECS"],
        ),
        (
            "classifier.confidence_threshold",
            config.classifier.confidence_threshold.to_string(),
            &["VLOG_CLASSIFIER_CONFIDENCE_THRESHOLD"],
        ),
        ("logging.level", config.logging.level.clone(), &["VLOG_LOGGING_LEVEL", "VLOG_LOG_LEVEL"]),
        (
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["VLOG_LOGGING_FORMAT", "VLOG_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    lines.extend(entries.iter().map(|(key, value, env_keys)| {
        render_line(key, value, field_source(key, env_keys, &file))
    }));
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config").join(DEFAULT_CONFIG_FILE)]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let raw = fs::read_to_string(path?).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(key_path: &str, env_keys: &[&str], file: &ConfigFile) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if file.doc.as_ref().is_some_and(|doc| contains_path(doc, key_path)) {
        let file_path = file
            .path
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "config file".to_string());
        return format!("file ({file_path})");
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

/// Keeps a short prefix such as `hf_` and hides the rest.
fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('_') {
        if prefix.len() <= 4 {
            return format!("{prefix}_***");
        }
    }

    "<redacted>".to_string()
}
