//! Broader, lower-precision pass used as the base layer of every merge.
//!
//! These patterns accept labeled answers ("location: Riverside") and looser
//! phrasing that the main pattern tables skip. Activity captures only count
//! when they canonicalize to a known category.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::activity::{accept_kid_count, ExtractionResult};
use crate::extraction::normalize::{
    canonicalize_activity, collapse_whitespace, is_canonical_activity, same_phrase, NameFilter,
};

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("fallback pattern must compile"))
        .collect()
}

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\bname\s*[:=]\s*([a-z][a-z'\-]+(?:\s+[a-z][a-z'\-]+)?)",
        r"(?i:\bmy\s+name\s+is|\bcall\s+me)\s+([A-Za-z][a-z'\-]+(?:\s+[A-Z][a-z'\-]+)?)",
    ])
});

const ACTIVITY_WORDS: &str = "teaching|tutoring|mentoring|coaching|reading|arts|crafts|cooking|baking|sports|music|dance|dancing|computer|helping|training|cleaning|organizing";

static ACTIVITY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let patterns = [
        r"\b(?:i|we)\s+(?:did|was|went|helped with|worked on|taught|tutored|mentored|coached)\s+([a-z][a-z ]*?)\s+(?:at|with|for|to|and|in)\b".to_string(),
        r"\b(?:activity|work|job|task|volunteering)\s*:\s*([a-z][a-z ]*)".to_string(),
        format!(r"\b(?:i|we)\s+(?:was\s+|were\s+)?({ACTIVITY_WORDS})\b"),
        format!(r"\b(?:doing|did)\s+({ACTIVITY_WORDS})\b"),
        format!(r"\b({ACTIVITY_WORDS}|taught|tutored|mentored|coached|cooked|baked)\b"),
    ];
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("fallback pattern must compile"))
        .collect()
});

static KIDS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(\d+)\s*(?:kids?|child(?:ren)?|students?|participants?|people|youngsters?)\b",
        r"\b(?:helped|taught|worked\s+with|mentored|coached|tutored|played\s+with|read\s+to)\s+(?:about\s+|around\s+)?(\d+)",
        r"\b(?:kids|children|students)\s*:\s*(\d+)",
        r"\bwith\s+(\d+)\s+(?:kids|children|students)",
    ])
});

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(?:location|place|venue|where)\s*:\s*([^\n,;]{3,40})",
        r"\b(?i:at|in)\s+(?:(?i:the)\s+)?([A-Z][a-zA-Z]*(?:\s+[A-Z][a-zA-Z]*){0,3})",
    ])
});

static ORGANIZATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\b(?:organization|organisation|charity|nonprofit|youth\s+house|org)\s*:\s*([^\n,;]{3,40})",
        r"\b(?i:for|at|with)\s+(?:(?i:the)\s+)?((?:[A-Z][a-zA-Z'&]*\s+){1,3}(?:Youth|Community|School|Center|Centre|House|Foundation|Club|Home)(?:\s+[A-Z][a-zA-Z]*)?)",
    ])
});

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i)\bdate\s*:\s*([^\n,;]{3,30})",
        r"(?i)\b(yesterday|today|last\s+weekend|this\s+weekend|last\s+week|this\s+week|last\s+month|this\s+month|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b",
        r"\b(\d{1,2}/\d{1,2}/\d{2,4})\b",
        r"(?i)\b((?:january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}(?:st|nd|rd|th)?)\b",
    ])
});

const TEMPORAL_WORDS: &[&str] = &[
    "today",
    "yesterday",
    "tomorrow",
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "morning",
    "afternoon",
    "evening",
    "night",
    "weekend",
];

#[derive(Clone, Debug, Default)]
pub struct FallbackExtractor {
    names: NameFilter,
}

impl FallbackExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_filter(names: NameFilter) -> Self {
        Self { names }
    }

    pub fn extract(&self, text: &str) -> ExtractionResult {
        let lowered = text.to_lowercase();
        let organization = first_capture(&ORGANIZATION_PATTERNS, text, |candidate| {
            Some(candidate.to_string())
        });
        ExtractionResult {
            name: first_capture(&NAME_PATTERNS, text, |candidate| {
                (!self.names.rejects(candidate)).then(|| candidate.to_string())
            }),
            activity_type: first_capture(&ACTIVITY_PATTERNS, &lowered, |candidate| {
                let canonical = canonicalize_activity(candidate);
                is_canonical_activity(&canonical).then_some(canonical)
            }),
            location: first_capture(&LOCATION_PATTERNS, text, |candidate| {
                let temporal = TEMPORAL_WORDS.contains(&candidate.to_lowercase().as_str());
                let is_organization =
                    organization.as_deref().is_some_and(|name| same_phrase(name, candidate));
                (candidate.chars().count() >= 3 && !temporal && !is_organization)
                    .then(|| candidate.to_string())
            }),
            number_of_kids: first_capture(&KIDS_PATTERNS, &lowered, |digits| {
                digits.parse::<u32>().ok().and_then(accept_kid_count)
            }),
            youth_house: organization,
            date: first_capture(&DATE_PATTERNS, text, |candidate| Some(candidate.to_string())),
        }
    }
}

/// Walks the patterns in order and returns the first capture the
/// acceptor keeps.
fn first_capture<T>(
    patterns: &[Regex],
    text: &str,
    accept: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    patterns.iter().find_map(|pattern| {
        pattern.captures_iter(text).find_map(|captures| {
            let candidate = collapse_whitespace(captures.get(1)?.as_str());
            if candidate.is_empty() {
                return None;
            }
            accept(&candidate)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::FallbackExtractor;

    #[test]
    fn labeled_answers_are_understood() {
        let result = FallbackExtractor::new().extract(
            "name: maria lopez\nactivity: homework help\nkids: 7\nlocation: riverside library\norganization: Bright Steps\ndate: 2 march",
        );

        assert_eq!(result.name.as_deref(), Some("maria lopez"));
        assert_eq!(result.activity_type.as_deref(), Some("tutoring"));
        assert_eq!(result.number_of_kids, Some(7));
        assert_eq!(result.location.as_deref(), Some("riverside library"));
        assert_eq!(result.youth_house.as_deref(), Some("Bright Steps"));
        assert_eq!(result.date.as_deref(), Some("2 march"));
    }

    #[test]
    fn unknown_activity_phrases_are_ignored() {
        let result = FallbackExtractor::new().extract("activity: something unusual");
        assert_eq!(result.activity_type, None);
    }

    #[test]
    fn verb_forms_map_to_categories() {
        let result = FallbackExtractor::new().extract("Yesterday we coached 15 kids at the Sunrise Youth Club");

        assert_eq!(result.activity_type.as_deref(), Some("coaching"));
        assert_eq!(result.number_of_kids, Some(15));
        assert_eq!(result.location, None);
        assert_eq!(result.youth_house.as_deref(), Some("Sunrise Youth Club"));
        assert_eq!(result.date.as_deref(), Some("Yesterday"));
    }

    #[test]
    fn place_named_after_the_organization_is_found() {
        let result =
            FallbackExtractor::new().extract("we coached kids at the Sunrise Youth Club in Chiang Mai");

        assert_eq!(result.youth_house.as_deref(), Some("Sunrise Youth Club"));
        assert_eq!(result.location.as_deref(), Some("Chiang Mai"));
    }

    #[test]
    fn lowercase_chatter_is_not_a_name() {
        let result = FallbackExtractor::new().extract("i'm so happy about it");
        assert_eq!(result.name, None);
    }
}
