use std::env;
use std::io;
use std::pin::Pin;
use std::sync::{Mutex, OnceLock};
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::io::AsyncWrite;
use vlog_cli::commands::{chat, config, doctor, extract, migrate, recent};
use vlog_core::config::{AppConfig, LoadOptions};

const MEMORY_DB: &[(&str, &str)] =
    &[("VLOG_DATABASE_URL", "sqlite::memory:"), ("VLOG_DATABASE_MAX_CONNECTIONS", "1")];

const INTRODUCTION: &str = "Hi I'm Sarah, I taught 12 kids at Hope Center yesterday";

#[test]
fn migrate_returns_success_with_memory_database() {
    with_env(MEMORY_DB, || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_invalid_env() {
    with_env(&[("VLOG_CLASSIFIER_TIMEOUT_SECS", "soon")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn extract_reports_fields_and_missing_location() {
    with_env(&[("VLOG_CLASSIFIER_ENABLED", "false")], || {
        let result = extract::run(INTRODUCTION, true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "extract");
        assert_eq!(payload["remote_classifier"], false);
        assert_eq!(payload["extracted"]["name"], "Sarah");
        assert_eq!(payload["extracted"]["number_of_kids"], 12);
        assert_eq!(payload["extracted"]["youth_house"], "Hope Center");
        assert_eq!(payload["missing"], serde_json::json!(["location"]));
    });
}

#[test]
fn extract_human_output_marks_missing_fields() {
    with_env(&[], || {
        let result = extract::run("hello there", false);
        assert_eq!(result.exit_code, 0);
        assert!(result.output.contains("(remote classifier unavailable)"));
        assert!(result.output.contains("- name = <missing>"));
    });
}

#[test]
fn config_redacts_api_key_and_names_env_source() {
    with_env(&[("VLOG_CLASSIFIER_API_KEY", "hf_supersecretvalue")], || {
        let output = config::run();
        assert!(output.contains("- classifier.api_key = hf_*** (source: env (VLOG_CLASSIFIER_API_KEY))"));
        assert!(!output.contains("supersecretvalue"));
        assert!(output.contains("- database.max_connections = 5 (source: default)"));
    });
}

#[test]
fn config_reports_alias_env_source() {
    with_env(&[("HUGGINGFACE_API_KEY", "hf_alias"), ("VLOG_LOG_LEVEL", "debug")], || {
        let output = config::run();
        assert!(output.contains("(source: env (HUGGINGFACE_API_KEY))"));
        assert!(output.contains("- logging.level = debug (source: env (VLOG_LOG_LEVEL))"));
    });
}

#[test]
fn doctor_passes_without_classifier_key() {
    with_env(MEMORY_DB, || {
        let payload = parse_payload(&doctor::run(true));
        assert_eq!(payload["overall_status"], "pass");

        let checks = payload["checks"].as_array().cloned().unwrap_or_default();
        let classifier = checks
            .iter()
            .find(|check| check["name"] == "classifier_readiness")
            .expect("classifier check present");
        assert_eq!(classifier["status"], "skipped");
    });
}

#[test]
fn doctor_fails_when_config_is_invalid() {
    with_env(&[("VLOG_CLASSIFIER_CONFIDENCE_THRESHOLD", "1.5")], || {
        let output = doctor::run(false);
        assert!(output.starts_with("doctor: one or more readiness checks failed"));
        assert!(output.contains("- [fail] config_validation"));
        assert!(output.contains("- [skip] database_schema"));
    });
}

#[test]
fn chat_saves_activity_then_recent_lists_it() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("log.db").display());

    with_env(&[("VLOG_DATABASE_URL", url.as_str()), ("VLOG_CLASSIFIER_ENABLED", "false")], || {
        let config = AppConfig::load(LoadOptions::default()).expect("valid config");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let script = format!("{INTRODUCTION}\nBangkok\nyes\nexit\n");
        let mut transcript = Vec::new();
        let result = runtime.block_on(chat::run_with_io(
            &config,
            script.as_bytes(),
            &mut transcript,
        ));
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let transcript = String::from_utf8(transcript).expect("utf-8 transcript");
        assert!(transcript.contains("Where did this volunteering take place?"));
        assert!(transcript.contains("Would you like me to save this"));
        assert!(transcript.contains("saved to row 1"));
        assert!(transcript.contains("Ready to log another activity?"));

        let recent = recent::run(5, true);
        assert_eq!(recent.exit_code, 0);
        let payload = parse_payload(&recent.output);
        assert_eq!(payload["rows"][0]["position"], 1);
        assert_eq!(payload["rows"][0]["row"]["name"], "Sarah");
        assert_eq!(payload["rows"][0]["row"]["location"], "Bangkok");
        assert_eq!(payload["rows"][0]["row"]["number_of_kids"], "12");
    });
}

#[test]
fn chat_reset_word_discards_progress() {
    with_env(MEMORY_DB, || {
        let config = AppConfig::load(LoadOptions::default()).expect("valid config");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let script = format!("{INTRODUCTION}\nstart over\n");
        let mut transcript = Vec::new();
        let result =
            runtime.block_on(chat::run_with_io(&config, script.as_bytes(), &mut transcript));

        let payload = parse_payload(&result.output);
        assert_eq!(payload["message"], "conversation ended; 0 activities saved");
        let transcript = String::from_utf8(transcript).expect("utf-8 transcript");
        assert!(transcript.contains("Ready to log another activity?"));
    });
}

#[test]
fn recent_reports_migration_failure_for_tampered_history() {
    let dir = tempfile::tempdir().expect("temp dir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("log.db").display());

    with_env(&[("VLOG_DATABASE_URL", url.as_str())], || {
        let config = AppConfig::load(LoadOptions::default()).expect("valid config");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        runtime.block_on(async {
            let pool = vlog_db::connect_with_config(&config.database).await.expect("connect");
            vlog_db::migrations::run_pending(&pool).await.expect("migrate");
            sqlx::query("UPDATE _sqlx_migrations SET checksum = x'00'")
                .execute(&pool)
                .await
                .expect("tamper checksum");
            pool.close().await;
        });
        drop(runtime);

        let result = recent::run(5, true);
        assert_eq!(result.exit_code, 5, "{}", result.output);
        assert_eq!(parse_payload(&result.output)["error_class"], "migration");

        let again = recent::run(5, true);
        assert_eq!(again.exit_code, 5, "database stays usable after a failed run");
    });
}

#[test]
fn chat_treats_new_as_an_ordinary_reply() {
    with_env(MEMORY_DB, || {
        let config = AppConfig::load(LoadOptions::default()).expect("valid config");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let script = format!("{INTRODUCTION}\nnew\n");
        let mut transcript = Vec::new();
        let result =
            runtime.block_on(chat::run_with_io(&config, script.as_bytes(), &mut transcript));
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let transcript = String::from_utf8(transcript).expect("utf-8 transcript");
        assert!(!transcript.contains("Ready to log another activity?"));
        assert_eq!(transcript.matches("Where did this volunteering take place?").count(), 2);
    });
}

#[test]
fn chat_reports_io_failure_when_closing_write_fails() {
    with_env(MEMORY_DB, || {
        let config = AppConfig::load(LoadOptions::default()).expect("valid config");
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");

        let output = BrokenAfter { writes_left: 1 };
        let result = runtime.block_on(chat::run_with_io(&config, "exit\n".as_bytes(), output));

        assert_eq!(result.exit_code, 7);
        let payload = parse_payload(&result.output);
        assert_eq!(payload["error_class"], "io");
    });
}

/// Accepts a fixed number of writes, then reports a broken pipe.
struct BrokenAfter {
    writes_left: usize,
}

impl AsyncWrite for BrokenAfter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.writes_left == 0 {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed")));
        }
        this.writes_left -= 1;
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "VLOG_DATABASE_URL",
        "VLOG_DATABASE_MAX_CONNECTIONS",
        "VLOG_DATABASE_TIMEOUT_SECS",
        "VLOG_CLASSIFIER_ENABLED",
        "VLOG_CLASSIFIER_API_KEY",
        "VLOG_CLASSIFIER_BASE_URL",
        "VLOG_CLASSIFIER_NER_MODEL",
        "VLOG_CLASSIFIER_GENERATION_MODEL",
        "VLOG_CLASSIFIER_ZERO_SHOT_MODEL",
        "VLOG_CLASSIFIER_TIMEOUT_SECS",
        "VLOG_CLASSIFIER_CONFIDENCE_THRESHOLD",
        "HUGGINGFACE_API_KEY",
        "VLOG_LOGGING_LEVEL",
        "VLOG_LOGGING_FORMAT",
        "VLOG_LOG_LEVEL",
        "VLOG_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
