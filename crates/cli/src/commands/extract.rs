use serde::Serialize;

use crate::commands::{load_config, runtime, CommandResult};
use vlog_agent::ExtractionPipeline;
use vlog_core::domain::activity::{ActivityField, ActivityRecord, ExtractionResult};
use vlog_core::SlotTracker;

#[derive(Debug, Serialize)]
struct ExtractReport {
    command: &'static str,
    status: &'static str,
    remote_classifier: bool,
    extracted: ExtractionResult,
    missing: Vec<&'static str>,
}

/// One-shot extraction of a single message, without conversation state.
pub fn run(text: &str, json_output: bool) -> CommandResult {
    let config = match load_config("extract") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("extract") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let pipeline = ExtractionPipeline::from_config(&config);
    let extracted = runtime.block_on(pipeline.submit_utterance(text, &[], None));
    let missing: Vec<ActivityField> =
        SlotTracker.missing_fields(&ActivityRecord::from(extracted.clone()));

    let report = ExtractReport {
        command: "extract",
        status: "ok",
        remote_classifier: pipeline.remote_available(),
        extracted,
        missing: missing.iter().map(ActivityField::key).collect(),
    };

    if json_output {
        return CommandResult::json("extract", &report);
    }
    CommandResult::text(render_human(&report))
}

fn render_human(report: &ExtractReport) -> String {
    let mut lines = vec![format!(
        "extracted {} of {} fields{}:",
        ActivityField::ALL.len() - report.missing.len(),
        ActivityField::ALL.len(),
        if report.remote_classifier { "" } else { " (remote classifier unavailable)" }
    )];
    for field in ActivityField::ALL {
        let value = report.extracted.display_value(field).unwrap_or_else(|| "<missing>".to_string());
        lines.push(format!("- {} = {value}", field.key()));
    }
    lines.join("\n")
}
