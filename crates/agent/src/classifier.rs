//! Remote extraction through three hosted-model strategies run
//! concurrently: entity recognition, structured text generation and
//! zero-shot activity classification.
//!
//! Every failure degrades to an empty contribution. The classifier never
//! returns an error to the conversation.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use vlog_core::config::ClassifierConfig;
use vlog_core::domain::activity::{ActivityField, ExtractionResult};

use crate::inference::{HuggingFaceBackend, InferenceBackend, InferenceError, TokenEntity};

pub const ACTIVITY_LABELS: [&str; 18] = [
    "teaching",
    "tutoring",
    "mentoring",
    "coaching",
    "reading",
    "arts and crafts",
    "cooking",
    "sports",
    "music",
    "dance",
    "computer skills",
    "homework help",
    "field trips",
    "games",
    "community service",
    "environmental work",
    "cleaning",
    "organizing",
];

const GENERATION_LABELS: [(&str, ActivityField); 6] = [
    ("name", ActivityField::Name),
    ("activity", ActivityField::ActivityType),
    ("location", ActivityField::Location),
    ("kids", ActivityField::NumberOfKids),
    ("organization", ActivityField::YouthHouse),
    ("date", ActivityField::Date),
];

static LABELED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^[ \t]*(name|activity|location|kids|organization|date)[ \t]*:[ \t]*(.*?)[ \t]*$")
        .expect("labeled line pattern must compile")
});

static LEADING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,3})\b").expect("leading digits pattern must compile"));

#[derive(Clone, Debug, PartialEq)]
pub struct ClassifierSettings {
    pub ner_model: String,
    pub generation_model: String,
    pub zero_shot_model: String,
    pub timeout: Duration,
    pub confidence_threshold: f64,
}

impl From<&ClassifierConfig> for ClassifierSettings {
    fn from(config: &ClassifierConfig) -> Self {
        Self {
            ner_model: config.ner_model.clone(),
            generation_model: config.generation_model.clone(),
            zero_shot_model: config.zero_shot_model.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            confidence_threshold: config.confidence_threshold,
        }
    }
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self::from(&ClassifierConfig::default())
    }
}

#[derive(Clone)]
pub struct RemoteClassifier {
    backend: Option<Arc<dyn InferenceBackend>>,
    settings: ClassifierSettings,
}

impl RemoteClassifier {
    pub fn new(backend: Arc<dyn InferenceBackend>, settings: ClassifierSettings) -> Self {
        Self { backend: Some(backend), settings }
    }

    /// A classifier that always contributes nothing.
    pub fn unavailable() -> Self {
        Self { backend: None, settings: ClassifierSettings::default() }
    }

    /// Disabled or credential-less configurations yield an unavailable
    /// classifier rather than an error.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        if !config.is_available() {
            debug!(event_name = "extraction.remote.disabled", "remote classifier not configured");
            return Self::unavailable();
        }
        match HuggingFaceBackend::from_config(config) {
            Ok(backend) => Self::new(Arc::new(backend), ClassifierSettings::from(config)),
            Err(error) => {
                warn!(
                    event_name = "extraction.remote.init_failed",
                    error = %error,
                    "remote classifier could not be built; continuing without it"
                );
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_some()
    }

    pub fn settings(&self) -> &ClassifierSettings {
        &self.settings
    }

    pub async fn classify(&self, text: &str) -> ExtractionResult {
        let Some(backend) = self.backend.as_deref() else {
            return ExtractionResult::default();
        };
        if text.trim().is_empty() {
            return ExtractionResult::default();
        }

        let prompt = generation_prompt(text);
        let strategies = async {
            tokio::join!(
                backend.token_classification(&self.settings.ner_model, text),
                backend.text_generation(&self.settings.generation_model, &prompt),
                backend.zero_shot(&self.settings.zero_shot_model, text, &ACTIVITY_LABELS),
            )
        };

        let (entities, generated, zero_shot) =
            match tokio::time::timeout(self.settings.timeout, strategies).await {
                Ok(results) => results,
                Err(_) => {
                    warn!(
                        event_name = "extraction.remote.timeout",
                        timeout_ms = self.settings.timeout.as_millis() as u64,
                        "remote classifier timed out; contributing nothing"
                    );
                    return ExtractionResult::default();
                }
            };

        let mut result = succeeded("token_classification", entities)
            .map(|entities| group_entities(&entities))
            .unwrap_or_default();

        if let Some(generated) = succeeded("text_generation", generated) {
            result.overlay(&parse_structured_output(&generated));
        }

        if let Some(zero_shot) = succeeded("zero_shot", zero_shot) {
            match zero_shot.top() {
                Some((label, score)) if score > self.settings.confidence_threshold => {
                    result.set_text(ActivityField::ActivityType, label);
                }
                top => debug!(
                    event_name = "extraction.remote.low_confidence",
                    top = ?top,
                    "zero-shot activity below threshold"
                ),
            }
        }

        debug!(
            event_name = "extraction.remote.completed",
            filled = result.filled_fields().len(),
            "remote classifier finished"
        );
        result
    }
}

fn succeeded<T>(strategy: &'static str, outcome: Result<T, InferenceError>) -> Option<T> {
    match outcome {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(
                event_name = "extraction.remote.strategy_failed",
                strategy,
                error = %error,
                "remote strategy failed; skipping its contribution"
            );
            None
        }
    }
}

/// Template-completion prompt; the model continues after the final
/// `Name:`.
pub fn generation_prompt(text: &str) -> String {
    format!(
        "Extract volunteer information from: \"{text}\"\n\nName:\nActivity:\nLocation:\nKids:\nOrganization:\nDate:\n\nName:"
    )
}

/// Reads `Label: value` lines from a generated continuation. The
/// continuation starts right after `Name:`, so it is re-prefixed before
/// scanning.
pub fn parse_structured_output(continuation: &str) -> ExtractionResult {
    let completed = format!("Name:{continuation}");
    let mut result = ExtractionResult::default();

    for captures in LABELED_LINE.captures_iter(&completed) {
        let (Some(label), Some(value)) = (captures.get(1), captures.get(2)) else {
            continue;
        };
        let Some(field) = GENERATION_LABELS
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(label.as_str()))
            .map(|(_, field)| *field)
        else {
            continue;
        };
        if result.has(field) {
            continue;
        }

        let value = value.as_str().trim();
        if is_placeholder(value) {
            continue;
        }
        match field {
            ActivityField::NumberOfKids => {
                if let Some(count) = LEADING_DIGITS
                    .captures(value)
                    .and_then(|captures| captures.get(1))
                    .and_then(|digits| digits.as_str().parse::<u32>().ok())
                {
                    result.set_kids(count);
                }
            }
            _ => result.set_text(field, value),
        }
    }

    result
}

fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim_matches(|ch: char| ch == '"' || ch.is_whitespace());
    trimmed.is_empty()
        || trimmed.chars().all(|ch| ch == '?' || ch == '-' || ch == '.')
        || trimmed.ends_with(':')
        || GENERATION_LABELS.iter().any(|(key, _)| key.eq_ignore_ascii_case(trimmed))
}

/// Person, organization and location entities become name, youth house
/// and location. Word-piece fragments (`##`) are glued to the previous
/// token; separate entities of one kind are joined with spaces.
pub fn group_entities(entities: &[TokenEntity]) -> ExtractionResult {
    let mut result = ExtractionResult::default();
    for (kind, field) in [
        ("PER", ActivityField::Name),
        ("ORG", ActivityField::YouthHouse),
        ("LOC", ActivityField::Location),
    ] {
        let mut pieces: Vec<String> = Vec::new();
        for entity in entities.iter().filter(|entity| entity.kind() == kind) {
            let word = entity.word.trim();
            match (word.strip_prefix("##"), pieces.last_mut()) {
                (Some(fragment), Some(previous)) => previous.push_str(fragment),
                (Some(fragment), None) => pieces.push(fragment.to_string()),
                (None, _) => pieces.push(word.to_string()),
            }
        }
        result.set_text(field, pieces.join(" "));
    }
    result
}
