//! Value canonicalization shared by every extraction strategy.
//!
//! Activity keywords and relative-date tokens are static ordered tables:
//! the first exact hit wins, then the first keyword contained anywhere in
//! the input, otherwise the lower-cased input passes through unchanged. Both
//! canonicalizers are idempotent.

use crate::domain::activity::{ActivityField, ExtractionResult};

pub const CANONICAL_ACTIVITIES: [&str; 13] = [
    "teaching",
    "mentoring",
    "tutoring",
    "sports",
    "arts and crafts",
    "reading",
    "cooking",
    "cleaning",
    "event organizing",
    "computer skills",
    "dance",
    "music",
    "coaching",
];

static ACTIVITY_KEYWORDS: &[(&str, &str)] = &[
    ("teach", "teaching"),
    ("taught", "teaching"),
    ("teaching", "teaching"),
    ("education", "teaching"),
    ("lesson", "teaching"),
    ("class", "teaching"),
    ("instruction", "teaching"),
    ("educating", "teaching"),
    ("tutor", "tutoring"),
    ("tutoring", "tutoring"),
    ("homework", "tutoring"),
    ("study", "tutoring"),
    ("academic", "tutoring"),
    ("studying", "tutoring"),
    ("mentor", "mentoring"),
    ("mentoring", "mentoring"),
    ("guidance", "mentoring"),
    ("counseling", "mentoring"),
    ("support", "mentoring"),
    ("helping", "mentoring"),
    ("coach", "coaching"),
    ("coaching", "coaching"),
    ("training", "coaching"),
    ("sport", "sports"),
    ("sports", "sports"),
    ("physical", "sports"),
    ("exercise", "sports"),
    ("fitness", "sports"),
    ("athletic", "sports"),
    ("basketball", "sports"),
    ("soccer", "sports"),
    ("football", "sports"),
    ("volleyball", "sports"),
    ("arts and crafts", "arts and crafts"),
    ("art", "arts and crafts"),
    ("arts", "arts and crafts"),
    ("craft", "arts and crafts"),
    ("crafts", "arts and crafts"),
    ("creative", "arts and crafts"),
    ("drawing", "arts and crafts"),
    ("painting", "arts and crafts"),
    ("artistic", "arts and crafts"),
    ("read", "reading"),
    ("reading", "reading"),
    ("story", "reading"),
    ("book", "reading"),
    ("literature", "reading"),
    ("stories", "reading"),
    ("cook", "cooking"),
    ("cooking", "cooking"),
    ("bake", "cooking"),
    ("food", "cooking"),
    ("kitchen", "cooking"),
    ("clean", "cleaning"),
    ("cleaning", "cleaning"),
    ("event organizing", "event organizing"),
    ("event", "event organizing"),
    ("organizing", "event organizing"),
    ("music", "music"),
    ("singing", "music"),
    ("dance", "dance"),
    ("dancing", "dance"),
    ("computer skills", "computer skills"),
    ("computer", "computer skills"),
    ("tech", "computer skills"),
    ("technology", "computer skills"),
    ("coding", "computer skills"),
    ("programming", "computer skills"),
];

static DATE_TOKENS: &[(&str, &str)] = &[
    ("today", "today"),
    ("yesterday", "yesterday"),
    ("last week", "last week"),
    ("this week", "this week"),
    ("last weekend", "last weekend"),
    ("this weekend", "this weekend"),
    ("last month", "last month"),
    ("this month", "this month"),
    ("monday", "Monday"),
    ("tuesday", "Tuesday"),
    ("wednesday", "Wednesday"),
    ("thursday", "Thursday"),
    ("friday", "Friday"),
    ("saturday", "Saturday"),
    ("sunday", "Sunday"),
];

pub const DEFAULT_NAME_EXCLUSIONS: &[&str] = &[
    "today",
    "yesterday",
    "tomorrow",
    "hope",
    "community",
    "foundation",
    "center",
    "centre",
    "house",
    "school",
    "program",
    "teaching",
    "reading",
    "playing",
    "working",
    "helped",
    "taught",
    "mentored",
    "volunteering",
    "activity",
    "kids",
    "children",
    "students",
    "boys",
    "girls",
    "when",
    "where",
    "what",
    "about",
    "with",
    "from",
    "good",
    "great",
    "nice",
    "amazing",
    "hi",
    "hello",
    "hey",
    "thanks",
    "yes",
    "no",
    "ok",
    "okay",
    "just",
    "so",
    "here",
    "back",
    "glad",
    "happy",
    "really",
    "very",
    "not",
    "also",
    "the",
];

/// Words that can never be (part of) a volunteer name.
#[derive(Clone, Debug)]
pub struct NameFilter {
    excluded: Vec<String>,
}

impl Default for NameFilter {
    fn default() -> Self {
        Self { excluded: DEFAULT_NAME_EXCLUSIONS.iter().map(|word| word.to_string()).collect() }
    }
}

impl NameFilter {
    pub fn with_exclusions<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { excluded: words.into_iter().map(|word| word.as_ref().to_lowercase()).collect() }
    }

    pub fn extend<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excluded.extend(words.into_iter().map(|word| word.as_ref().to_lowercase()));
        self
    }

    /// True when the candidate is too short/long or contains an excluded word.
    pub fn rejects(&self, candidate: &str) -> bool {
        let length = candidate.trim().chars().count();
        if !(2..=50).contains(&length) {
            return true;
        }
        candidate
            .split_whitespace()
            .any(|word| self.excluded.iter().any(|excluded| excluded.eq_ignore_ascii_case(word)))
    }

    /// Strips everything but letters, spaces, apostrophes and hyphens, then
    /// re-validates.
    pub fn sanitize(&self, raw: &str) -> Option<String> {
        let cleaned: String = raw
            .chars()
            .filter(|ch| ch.is_alphabetic() || ch.is_whitespace() || matches!(ch, '\'' | '-'))
            .collect();
        let cleaned = collapse_whitespace(&cleaned);
        (!self.rejects(&cleaned)).then_some(cleaned)
    }
}

pub fn canonicalize_activity(raw: &str) -> String {
    let normalized = collapse_whitespace(&raw.to_lowercase());

    if let Some((_, category)) =
        ACTIVITY_KEYWORDS.iter().find(|(keyword, _)| *keyword == normalized)
    {
        return (*category).to_string();
    }

    ACTIVITY_KEYWORDS
        .iter()
        .find(|(keyword, _)| normalized.contains(keyword))
        .map(|(_, category)| (*category).to_string())
        .unwrap_or(normalized)
}

pub fn is_canonical_activity(value: &str) -> bool {
    CANONICAL_ACTIVITIES.contains(&value)
}

/// Relative terms and weekday names map to fixed tokens ("last friday" is
/// "Friday"); anything else is lower-cased and trimmed. Calendar dates are
/// not rewritten.
pub fn normalize_date(raw: &str) -> String {
    let normalized = collapse_whitespace(&raw.to_lowercase());

    if let Some(token) = lookup_date_token(&normalized) {
        return token.to_string();
    }

    for prefix in ["last ", "this ", "on ", "past "] {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            if let Some(token) = lookup_date_token(rest).filter(|token| is_weekday(token)) {
                return token.to_string();
            }
        }
    }

    normalized
}

fn lookup_date_token(value: &str) -> Option<&'static str> {
    DATE_TOKENS.iter().find(|(key, _)| *key == value).map(|(_, token)| *token)
}

fn is_weekday(token: &str) -> bool {
    token.chars().next().is_some_and(char::is_uppercase)
}

pub fn sanitize_location(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, ',' | '.' | '-' | '_'))
        .collect();
    let cleaned = collapse_whitespace(&cleaned);
    (!cleaned.is_empty()).then_some(cleaned)
}

pub fn sanitize_organization(raw: &str) -> Option<String> {
    let cleaned = collapse_whitespace(raw.trim_matches(|ch: char| ch.is_ascii_punctuation()));
    (!cleaned.is_empty()).then_some(cleaned)
}

/// A phrase such as "Hope Center" can be read as both the place and the
/// organization. It stays an organization unless the turn answers a
/// location question, in which case the organization reading is dropped.
pub fn resolve_place_collision(result: &mut ExtractionResult, expected: Option<ActivityField>) {
    let collides = match (&result.location, &result.youth_house) {
        (Some(location), Some(organization)) => same_phrase(location, organization),
        _ => false,
    };
    if !collides {
        return;
    }

    if expected == Some(ActivityField::Location) {
        result.clear(ActivityField::YouthHouse);
    } else {
        result.clear(ActivityField::Location);
    }
}

/// Case-insensitive equality that ignores a leading "the".
pub(crate) fn same_phrase(left: &str, right: &str) -> bool {
    let strip = |value: &str| {
        let lowered = collapse_whitespace(&value.to_lowercase());
        lowered.strip_prefix("the ").map(str::to_string).unwrap_or(lowered)
    };
    strip(left) == strip(right)
}

pub(crate) fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
