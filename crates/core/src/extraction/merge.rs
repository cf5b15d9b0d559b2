//! Precedence merge of the per-strategy results for one utterance.
//!
//! Layers are folded lowest precedence first: a direct answer to the
//! question just asked, the broad fallback pass, the pattern tables, and
//! finally the remote classifier. A later layer overrides a field only
//! when it actually has a value for it. The merged values are then
//! canonicalized.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::domain::activity::{accept_kid_count, ActivityField, ExtractionResult};
use crate::extraction::fallback::FallbackExtractor;
use crate::extraction::normalize::{
    canonicalize_activity, collapse_whitespace, normalize_date, resolve_place_collision,
    sanitize_location, sanitize_organization, NameFilter,
};
use crate::extraction::patterns::{is_temporal_phrase, starts_with_temporal_word};

static BARE_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(?:about|around|roughly|maybe|like|only|just)?\s*(\d+)\s*(?:kids?|children|students)?\s*[.!]?\s*$")
        .expect("bare count pattern must compile")
});

static BARE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Z][a-zA-Z'\-]+(?:\s+[A-Z][a-zA-Z'\-]+)?)\s*[.!]?\s*$")
        .expect("bare name pattern must compile")
});

static BARE_PLACE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?i:at|in|for|with)\s+)?(?:(?i:the)\s+)?([A-Z0-9][\w'&,.\- ]{1,58}?)\s*[.!]?\s*$")
        .expect("bare place pattern must compile")
});

const MAX_BARE_PLACE_WORDS: usize = 6;

#[derive(Clone, Debug, Default)]
pub struct ExtractionMerger {
    fallback: FallbackExtractor,
    names: NameFilter,
}

impl ExtractionMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_filter(names: NameFilter) -> Self {
        Self { fallback: FallbackExtractor::with_name_filter(names.clone()), names }
    }

    pub fn merge(
        &self,
        pattern: &ExtractionResult,
        remote: &ExtractionResult,
        raw_text: &str,
    ) -> ExtractionResult {
        self.merge_with_hint(pattern, remote, raw_text, None)
    }

    /// `expected` is the field the previous question asked for. It lets a
    /// bare reply ("15", "Maria") fill that field and decides which reading
    /// survives when the same phrase was taken as both place and
    /// organization.
    pub fn merge_with_hint(
        &self,
        pattern: &ExtractionResult,
        remote: &ExtractionResult,
        raw_text: &str,
        expected: Option<ActivityField>,
    ) -> ExtractionResult {
        let direct = expected.map(|field| direct_answer(field, raw_text)).unwrap_or_default();
        let fallback = self.fallback.extract(raw_text);

        let merged = precedence_fold(&[direct, fallback, pattern.clone(), remote.clone()]);
        let mut normalized = self.normalize(merged);
        resolve_place_collision(&mut normalized, expected);

        debug!(
            event_name = "extraction.merged",
            filled = normalized.filled_fields().len(),
            expected_field = ?expected,
            "merged extraction layers"
        );
        normalized
    }

    fn normalize(&self, merged: ExtractionResult) -> ExtractionResult {
        ExtractionResult {
            name: merged.name.as_deref().and_then(|name| self.names.sanitize(name)),
            activity_type: merged
                .activity_type
                .as_deref()
                .map(canonicalize_activity)
                .filter(|activity| !activity.is_empty()),
            location: merged.location.as_deref().and_then(sanitize_location),
            number_of_kids: merged.number_of_kids.and_then(accept_kid_count),
            youth_house: merged.youth_house.as_deref().and_then(sanitize_organization),
            date: merged.date.as_deref().map(normalize_date).filter(|date| !date.is_empty()),
        }
    }
}

/// Overlays each layer on the previous ones, lowest precedence first.
pub fn precedence_fold(layers: &[ExtractionResult]) -> ExtractionResult {
    layers.iter().fold(ExtractionResult::default(), |mut merged, layer| {
        merged.overlay(layer);
        merged
    })
}

/// Reads the whole utterance as an answer to the question for `field`.
fn direct_answer(field: ActivityField, raw_text: &str) -> ExtractionResult {
    let mut answer = ExtractionResult::default();
    let capture = |pattern: &Regex| {
        pattern
            .captures(raw_text)
            .and_then(|captures| captures.get(1))
            .map(|value| collapse_whitespace(value.as_str()))
    };

    match field {
        ActivityField::NumberOfKids => {
            if let Some(digits) = capture(&BARE_COUNT) {
                answer.set_text(field, digits);
            }
        }
        ActivityField::Name => {
            if let Some(name) = capture(&BARE_NAME) {
                answer.set_text(field, name);
            }
        }
        ActivityField::Location | ActivityField::YouthHouse => {
            if let Some(place) = capture(&BARE_PLACE).filter(|place| {
                place.split_whitespace().count() <= MAX_BARE_PLACE_WORDS
                    && !is_temporal_phrase(place)
                    && !starts_with_temporal_word(place)
            }) {
                answer.set_text(field, place);
            }
        }
        ActivityField::ActivityType | ActivityField::Date => {}
    }
    answer
}
