//! Deterministic extraction from ordered regular-expression tables.
//!
//! For every field the tables are tried in order and the first acceptable
//! capture wins. Names, places and organizations are matched against the
//! original text because capitalization matters there; activity and count
//! patterns run on the lower-cased text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::activity::{accept_kid_count, ExtractionResult};
use crate::extraction::normalize::{
    collapse_whitespace, resolve_place_collision, same_phrase, NameFilter,
};

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("extraction pattern must compile"))
        .collect()
}

static NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(?i:\bmy\s+name\s+is|\bcall\s+me)\s+([A-Za-z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"\b(?i:i['’]?m|i\s+am|this\s+is)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"^\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s+(?i:here|volunteering|helped|taught|did|worked|assisted|mentored|coached|tutored)\b",
        r"\b(?i:it['’]?s|name['’]?s)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"\b(?i:volunteer)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"^\s*([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)\s*[.,!]?\s*(?:I|We|Yesterday|Today|Last)\b",
    ])
});

static ACTIVITY_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let table: [(&str, &str); 10] = [
        (
            "teaching",
            r"\b(?:teach|taught|lesson|education|class|instruction|school|math|english|reading|writing|homework|study|learning|subject|curriculum|academic|educational)",
        ),
        (
            "mentoring",
            r"\b(?:mentor|guidance|counsel|advice|support|life skills|career|personal development|coaching|motivating|inspiring)",
        ),
        (
            "tutoring",
            r"\b(?:tutor|homework help|exam|test prep|study group|study session|one.on.one|individual help)",
        ),
        (
            "sports",
            r"\b(?:sports?|football|basketball|soccer|tennis|volleyball|game|play|exercise|physical|athletic|training|fitness|running|swimming|cycling)",
        ),
        (
            "arts and crafts",
            r"\b(?:art|drawing|painting|craft|creative|music|singing|dance|drama|theater|theatre|pottery|sculpture|handicraft)",
        ),
        ("reading", r"\b(?:read|story|stories|book|library|storytime|literacy|storytelling)"),
        ("cooking", r"\b(?:cook|bake|baking|food|kitchen|meal|recipe|nutrition|culinary|chef)"),
        (
            "cleaning",
            r"\b(?:clean|organize|tidy|maintenance|gardening|landscaping|environment|trash|garbage|recycling)",
        ),
        (
            "event organizing",
            r"\b(?:event|party|celebration|festival|fundraiser|organiz|planning|coordination|setup|conference|workshop|seminar)",
        ),
        (
            "computer skills",
            r"\b(?:computer|coding|programming|technology|digital|internet|software|apps?\b|tech\b|technical)",
        ),
    ];
    table
        .into_iter()
        .map(|(category, pattern)| {
            (category, Regex::new(pattern).expect("activity pattern must compile"))
        })
        .collect()
});

static KIDS_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"(\d+)\s*(?:kids?|child(?:ren)?|students?|boys?|girls?)\b",
        r"\b(?:helped|taught|mentored|assisted|worked\s+with)\s*(\d+)",
        r"(\d+)\s*(?:young|little)\s*(?:ones?|people)",
        r"\bgroup\s*of\s*(\d+)",
        r"(\d+)\s*(?:participants?|volunteers?)",
        r"\b(?:about|around|with)\s*(\d+)\s*(?:kids?|child(?:ren)?)",
        r"(\d+)\s*(?:teens?|teenagers?)",
        r"(\d+)\s*(?:youths?|young\s+people)",
    ])
});

const PREPOSITION: &str = r"\b(?i:at|in|to|from)\s+(?:(?i:the)\s+)?";

static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    let patterns = [
        format!(
            r"{PREPOSITION}((?:[A-Z][a-zA-Z'&]*\s+){{0,4}}(?:Center|Centre|School|Library|Park|House|Foundation|Organization|Hall|Church|Temple|Hospital|Orphanage))\b"
        ),
        format!(r"{PREPOSITION}(Ban\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)"),
        format!(r"{PREPOSITION}((?:[A-Z][a-zA-Z'&]*\s+){{0,3}}(?:Community|Village|District))\b"),
        format!(r"{PREPOSITION}([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+){{0,3}})"),
        format!(r"{PREPOSITION}(\d+\s+[A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+){{0,3}})"),
    ];
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("location pattern must compile"))
        .collect()
});

static ORGANIZATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"\b((?:[A-Z][a-zA-Z'&]*\s+){1,4}(?:Foundation|Organization|Organisation|NGO|Charity|Trust))\b",
        r"\b((?:[A-Z][a-zA-Z'&]*\s+){1,4}(?:Center|Centre|House|Home))\b",
        r"(?i)\b(boys?\s*(?:and|&)\s*girls?\s+club)\b",
        r"(?i)\b(ymca|ywca)\b",
        r"(?i)\b(red\s+cross)\b",
        r"(?i)\b(salvation\s+army)\b",
        r"(?i)\b(united\s+way)\b",
        r"\b((?:Hope|Care|Love|Help|Support|Future|Dream|Bright|New)\s+[A-Z][a-zA-Z]*(?:\s+[A-Z][a-zA-Z]*){0,3})",
    ])
});

static SYMBOLIC_DATES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let table: [(&str, &str); 17] = [
        ("yesterday", r"(?i)\byesterday\b"),
        ("today", r"(?i)\btoday\b"),
        ("last weekend", r"(?i)\blast\s+weekend\b"),
        ("this weekend", r"(?i)\bthis\s+weekend\b"),
        ("last week", r"(?i)\blast\s+week\b"),
        ("this week", r"(?i)\bthis\s+week\b"),
        ("last month", r"(?i)\blast\s+month\b"),
        ("this month", r"(?i)\bthis\s+month\b"),
        ("Monday", r"(?i)\b(?:monday|mon)\b"),
        ("Tuesday", r"(?i)\b(?:tuesday|tues|tue)\b"),
        ("Wednesday", r"(?i)\b(?:wednesday|wed)\b"),
        ("Thursday", r"(?i)\b(?:thursday|thurs|thur|thu)\b"),
        ("Friday", r"(?i)\b(?:friday|fri)\b"),
        ("Saturday", r"(?i)\bsaturday\b"),
        ("Sunday", r"(?i)\bsunday\b"),
        ("few days ago", r"(?i)\b(?:a\s+)?few\s+days?\s+ago\b"),
        ("a week ago", r"(?i)\ba\s+week\s+ago\b"),
    ];
    table
        .into_iter()
        .map(|(token, pattern)| (token, Regex::new(pattern).expect("date pattern must compile")))
        .collect()
});

const MONTH: &str = r"(?:jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)";

static LITERAL_DATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    let patterns = [
        r"\b\d{4}-\d{2}-\d{2}\b".to_string(),
        r"\b\d{1,2}[/\-.]\d{1,2}[/\-.]\d{2,4}\b".to_string(),
        format!(r"(?i)\b{MONTH}\.?\s+\d{{1,2}}(?:st|nd|rd|th)?,?\s+\d{{4}}\b"),
        format!(r"(?i)\b\d{{1,2}}(?:st|nd|rd|th)?\s+{MONTH}\.?,?\s+\d{{4}}\b"),
    ];
    patterns
        .iter()
        .map(|pattern| Regex::new(pattern).expect("date pattern must compile"))
        .collect()
});

/// Words that can start a capitalized phrase without being part of a place.
const PLACE_STOPWORDS: &[&str] = &[
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
    "week",
    "weekend",
    "month",
    "year",
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
    "last",
    "this",
    "next",
    "the",
];

const ORGANIZATION_LEADING_NOISE: &[&str] = &[
    "at", "in", "to", "from", "for", "with", "i", "we", "yesterday", "today", "last", "this", "and",
    "hi", "hello",
];

#[derive(Clone, Debug, Default)]
pub struct PatternExtractor {
    names: NameFilter,
}

impl PatternExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name_filter(names: NameFilter) -> Self {
        Self { names }
    }

    /// Never fails; an utterance with no recognizable content yields an
    /// empty result.
    pub fn extract(&self, text: &str) -> ExtractionResult {
        let lowered = text.to_lowercase();
        let organization = extract_organization(text);
        let mut result = ExtractionResult {
            name: self.extract_name(text),
            activity_type: extract_activity(&lowered),
            location: extract_location(text, organization.as_deref()),
            number_of_kids: extract_kids(&lowered),
            youth_house: organization,
            date: extract_date(text),
        };
        resolve_place_collision(&mut result, None);
        result
    }

    fn extract_name(&self, text: &str) -> Option<String> {
        NAME_PATTERNS.iter().find_map(|pattern| {
            pattern.captures_iter(text).find_map(|captures| {
                let candidate = collapse_whitespace(captures.get(1)?.as_str());
                (!self.names.rejects(&candidate)).then_some(candidate)
            })
        })
    }
}

fn extract_activity(lowered: &str) -> Option<String> {
    ACTIVITY_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(lowered))
        .map(|(category, _)| (*category).to_string())
}

fn extract_kids(lowered: &str) -> Option<u32> {
    KIDS_PATTERNS.iter().find_map(|pattern| {
        let digits = pattern.captures(lowered)?.get(1)?.as_str();
        digits.parse::<u32>().ok().and_then(accept_kid_count)
    })
}

/// The organization phrase is skipped so a place named later in the same
/// sentence can still be found.
fn extract_location(text: &str, organization: Option<&str>) -> Option<String> {
    LOCATION_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(text).find_map(|captures| {
            let candidate = collapse_whitespace(captures.get(1)?.as_str());
            let length = candidate.chars().count();
            let is_organization = organization.is_some_and(|name| same_phrase(name, &candidate));
            ((3..=60).contains(&length) && !is_temporal_phrase(&candidate) && !is_organization)
                .then_some(candidate)
        })
    })
}

fn extract_organization(text: &str) -> Option<String> {
    ORGANIZATION_PATTERNS.iter().find_map(|pattern| {
        pattern.captures_iter(text).find_map(|captures| {
            let candidate = strip_leading_noise(captures.get(1)?.as_str());
            (!candidate.is_empty() && !is_temporal_phrase(&candidate)).then_some(candidate)
        })
    })
}

fn extract_date(text: &str) -> Option<String> {
    if let Some((token, _)) = SYMBOLIC_DATES.iter().find(|(_, pattern)| pattern.is_match(text)) {
        return Some((*token).to_string());
    }
    LITERAL_DATES
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|literal| literal.as_str().to_string())
}

pub(crate) fn is_temporal_phrase(phrase: &str) -> bool {
    phrase.split_whitespace().all(is_temporal_word)
}

pub(crate) fn starts_with_temporal_word(phrase: &str) -> bool {
    phrase.split_whitespace().next().is_some_and(is_temporal_word)
}

fn is_temporal_word(word: &str) -> bool {
    let word = word.trim_matches(|ch: char| !ch.is_alphanumeric()).to_lowercase();
    PLACE_STOPWORDS.contains(&word.as_str())
}

fn strip_leading_noise(phrase: &str) -> String {
    let words: Vec<&str> = phrase.split_whitespace().collect();
    let start = words
        .iter()
        .position(|word| {
            let lowered = word.to_lowercase();
            !ORGANIZATION_LEADING_NOISE.contains(&lowered.as_str())
                && !PLACE_STOPWORDS.contains(&lowered.as_str())
        })
        .unwrap_or(words.len());
    words[start..].join(" ")
}

#[cfg(test)]
mod tests {
    use super::PatternExtractor;
    use crate::domain::activity::ExtractionResult;
    use crate::extraction::normalize::NameFilter;

    #[test]
    fn introduction_sentence_fills_five_fields() {
        let result = PatternExtractor::new()
            .extract("Hi I'm Sarah, I taught 12 kids at Hope Center yesterday");

        assert_eq!(result.name.as_deref(), Some("Sarah"));
        assert_eq!(result.activity_type.as_deref(), Some("teaching"));
        assert_eq!(result.number_of_kids, Some(12));
        assert_eq!(result.youth_house.as_deref(), Some("Hope Center"));
        assert_eq!(result.date.as_deref(), Some("yesterday"));
        assert_eq!(result.location, None);
    }

    #[test]
    fn place_and_organization_are_distinct_when_named_separately() {
        let result = PatternExtractor::new().extract(
            "My name is Tom and I did cooking with 8 children for the Bright Future Foundation in Ban Nong Khai last week",
        );

        assert_eq!(result.name.as_deref(), Some("Tom"));
        assert_eq!(result.activity_type.as_deref(), Some("cooking"));
        assert_eq!(result.number_of_kids, Some(8));
        assert_eq!(result.youth_house.as_deref(), Some("Bright Future Foundation"));
        assert_eq!(result.location.as_deref(), Some("Ban Nong Khai"));
        assert_eq!(result.date.as_deref(), Some("last week"));
    }

    #[test]
    fn place_after_organization_phrase_is_kept() {
        let result = PatternExtractor::new()
            .extract("I'm Sarah, I taught 12 kids at Hope Center in Bangkok yesterday");

        assert_eq!(result.youth_house.as_deref(), Some("Hope Center"));
        assert_eq!(result.location.as_deref(), Some("Bangkok"));
        assert_eq!(result.date.as_deref(), Some("yesterday"));
    }

    #[test]
    fn out_of_range_counts_are_dropped() {
        let result = PatternExtractor::new().extract("I helped 2500 kids");
        assert_eq!(result.number_of_kids, None);

        let zero = PatternExtractor::new().extract("there were 0 kids");
        assert_eq!(zero.number_of_kids, None);
    }

    #[test]
    fn excluded_words_are_never_names() {
        let extractor = PatternExtractor::new();
        assert_eq!(extractor.extract("I'm Teaching today").name, None);
        assert_eq!(extractor.extract("I am Hope").name, None);

        let strict = PatternExtractor::with_name_filter(NameFilter::with_exclusions(["Sarah"]));
        assert_eq!(strict.extract("I'm Sarah").name, None);
    }

    #[test]
    fn weekday_matching_respects_word_boundaries() {
        let extractor = PatternExtractor::new();
        assert_eq!(extractor.extract("we meet every month").date, None);
        assert_eq!(extractor.extract("last Friday").date.as_deref(), Some("Friday"));
        assert_eq!(extractor.extract("last weekend").date.as_deref(), Some("last weekend"));
    }

    #[test]
    fn literal_dates_are_kept_verbatim() {
        let extractor = PatternExtractor::new();
        assert_eq!(extractor.extract("on 12/05/2024").date.as_deref(), Some("12/05/2024"));
        assert_eq!(
            extractor.extract("It was March 3, 2025").date.as_deref(),
            Some("March 3, 2025")
        );
    }

    #[test]
    fn temporal_words_are_not_places() {
        let result = PatternExtractor::new().extract("I volunteered in September");
        assert_eq!(result.location, None);
    }

    #[test]
    fn well_known_organizations_are_recognized() {
        let result = PatternExtractor::new().extract("helped out at the ymca");
        assert_eq!(result.youth_house.as_deref(), Some("ymca"));
    }

    #[test]
    fn unrecognizable_input_yields_empty_result() {
        let extractor = PatternExtractor::new();
        for input in ["", "   ", "???", "ok", "\u{1F600}\u{1F600}", "1234567890123456789012345 kids"] {
            assert_eq!(extractor.extract(input), ExtractionResult::default(), "input {input:?}");
        }
    }
}
