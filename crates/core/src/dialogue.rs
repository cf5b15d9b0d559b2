//! Question selection and message rendering for the activity conversation.
//!
//! The controller is stateless: every method works from the missing-field
//! set and the caller-owned record.

use crate::domain::activity::{ActivityField, ActivityRecord, ExtractionResult};

/// Order in which missing fields are asked about. Differs from the
/// canonical field order: the count comes before the place.
pub const QUESTION_PRIORITY: [ActivityField; 6] = [
    ActivityField::Name,
    ActivityField::ActivityType,
    ActivityField::NumberOfKids,
    ActivityField::Location,
    ActivityField::YouthHouse,
    ActivityField::Date,
];

pub const COMPLETION_ACKNOWLEDGMENT: &str =
    "Perfect! I have all the required information. Would you like me to save this activity?";

pub const FRESH_START_PROMPT: &str =
    "Ready to log another activity? What's your name and tell me about what you did!";

const AFFIRMATIVE_REPLIES: &[&str] = &[
    "yes",
    "y",
    "yeah",
    "yep",
    "yup",
    "sure",
    "ok",
    "okay",
    "save",
    "save it",
    "yes please",
    "please do",
    "please save",
    "go ahead",
    "do it",
    "confirm",
    "correct",
    "sounds good",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct DialogueController;

impl DialogueController {
    /// The field the next question will be about, if any is missing.
    pub fn next_field(&self, missing: &[ActivityField]) -> Option<ActivityField> {
        QUESTION_PRIORITY.into_iter().find(|field| missing.contains(field))
    }

    pub fn next_question(&self, missing: &[ActivityField], record: &ActivityRecord) -> String {
        let Some(field) = self.next_field(missing) else {
            return COMPLETION_ACKNOWLEDGMENT.to_string();
        };

        let question = match record.name() {
            Some(name) if field != ActivityField::Name => personalized_question(field, name.trim()),
            _ => base_question(field).to_string(),
        };

        if missing.len() > 1 {
            let total = ActivityField::ALL.len();
            let completed = total.saturating_sub(missing.len());
            format!("{question} ({completed}/{total} complete)")
        } else {
            question
        }
    }

    /// "{name} did {activity} with {N} kids at {location} ({organization})
    /// on {date}", skipping clauses for absent fields.
    pub fn summarize(&self, record: &ActivityRecord) -> String {
        let clauses: [(ActivityField, fn(&str) -> String); 6] = [
            (ActivityField::Name, |value| value.to_string()),
            (ActivityField::ActivityType, |value| format!("did {value}")),
            (ActivityField::NumberOfKids, |value| format!("with {value} kids")),
            (ActivityField::Location, |value| format!("at {value}")),
            (ActivityField::YouthHouse, |value| format!("({value})")),
            (ActivityField::Date, |value| format!("on {value}")),
        ];

        clauses
            .iter()
            .filter_map(|(field, render)| record.display_value(*field).map(|value| render(&value)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Echo of what a single turn contributed, prefixed to the next question.
    pub fn acknowledge(&self, turn: &ExtractionResult) -> String {
        let found: Vec<String> = [
            (ActivityField::Name, "name: "),
            (ActivityField::ActivityType, "activity: "),
            (ActivityField::NumberOfKids, ""),
            (ActivityField::Location, "location: "),
            (ActivityField::YouthHouse, "organization: "),
            (ActivityField::Date, "date: "),
        ]
        .into_iter()
        .filter_map(|(field, label)| {
            turn.display_value(field).map(|value| match field {
                ActivityField::NumberOfKids => format!("{value} kids"),
                _ => format!("{label}{value}"),
            })
        })
        .collect();

        if found.is_empty() {
            "Thanks for that! ".to_string()
        } else {
            format!("Great! I got {}. ", found.join(", "))
        }
    }

    pub fn completion_prompt(&self, record: &ActivityRecord) -> String {
        format!(
            "Perfect! I have all the information I need. Here's what I recorded: {}. Would you like me to save this to your volunteer log?",
            self.summarize(record)
        )
    }

    pub fn saved_message(&self, record: &ActivityRecord, position: i64) -> String {
        let thanks = record.name().map(|name| format!(" Thank you {}", name.trim())).unwrap_or_else(
            || " Thank you".to_string(),
        );
        format!(
            "Success! Your volunteering activity has been saved to row {position} in the log.{thanks} for making a difference! Would you like to log another activity?"
        )
    }

    pub fn save_failed_message(&self, reason: &str) -> String {
        format!(
            "Sorry, there was an error saving your activity: {reason}. Please try again or contact support."
        )
    }

    pub fn fresh_start_prompt(&self) -> &'static str {
        FRESH_START_PROMPT
    }

    pub fn is_affirmative(&self, reply: &str) -> bool {
        let normalized = reply
            .trim()
            .trim_end_matches(|ch: char| ch.is_ascii_punctuation() || ch.is_whitespace())
            .to_lowercase();
        AFFIRMATIVE_REPLIES.contains(&normalized.as_str())
    }
}

fn base_question(field: ActivityField) -> &'static str {
    match field {
        ActivityField::Name => {
            "Hi there! What's your name? I need to know who did this amazing volunteering work!"
        }
        ActivityField::ActivityType => {
            "What type of activity did you do? (e.g., teaching, mentoring, sports, arts and crafts)"
        }
        ActivityField::Location => "Where did this volunteering take place?",
        ActivityField::NumberOfKids => "How many kids did you help or work with?",
        ActivityField::YouthHouse => "Which organization or youth house was this for?",
        ActivityField::Date => "When did this volunteering activity happen?",
    }
}

fn personalized_question(field: ActivityField, name: &str) -> String {
    match field {
        ActivityField::Name => base_question(field).to_string(),
        ActivityField::ActivityType => format!("Hi {name}! What type of activity did you do?"),
        ActivityField::Location => format!("Thanks {name}! Where did this volunteering take place?"),
        ActivityField::NumberOfKids => format!("Great {name}! How many kids did you work with?"),
        ActivityField::YouthHouse => {
            format!("Nice {name}! Which organization or youth house was this for?")
        }
        ActivityField::Date => format!("Almost done {name}! When did this happen?"),
    }
}

#[cfg(test)]
mod tests {
    use super::{DialogueController, COMPLETION_ACKNOWLEDGMENT};
    use crate::domain::activity::{ActivityField, ActivityRecord, ExtractionResult};

    fn sarah_record() -> ActivityRecord {
        ActivityRecord::from(ExtractionResult {
            name: Some("Sarah".to_string()),
            activity_type: Some("teaching".to_string()),
            number_of_kids: Some(12),
            youth_house: Some("Hope Center".to_string()),
            date: Some("yesterday".to_string()),
            ..ExtractionResult::default()
        })
    }

    #[test]
    fn location_is_asked_before_date() {
        let question = DialogueController.next_question(
            &[ActivityField::Location, ActivityField::Date],
            &ActivityRecord::new(),
        );

        assert_eq!(question, "Where did this volunteering take place? (4/6 complete)");
    }

    #[test]
    fn count_is_asked_before_location() {
        let controller = DialogueController;
        assert_eq!(
            controller.next_field(&[ActivityField::Location, ActivityField::NumberOfKids]),
            Some(ActivityField::NumberOfKids)
        );
    }

    #[test]
    fn known_name_personalizes_and_single_missing_has_no_suffix() {
        let question =
            DialogueController.next_question(&[ActivityField::Location], &sarah_record());

        assert_eq!(question, "Thanks Sarah! Where did this volunteering take place?");
    }

    #[test]
    fn name_question_is_never_personalized() {
        let question = DialogueController.next_question(&ActivityField::ALL, &ActivityRecord::new());
        assert_eq!(
            question,
            "Hi there! What's your name? I need to know who did this amazing volunteering work! (0/6 complete)"
        );
    }

    #[test]
    fn nothing_missing_yields_completion_acknowledgment() {
        assert_eq!(
            DialogueController.next_question(&[], &sarah_record()),
            COMPLETION_ACKNOWLEDGMENT
        );
    }

    #[test]
    fn summary_skips_absent_clauses() {
        assert_eq!(
            DialogueController.summarize(&sarah_record()),
            "Sarah did teaching with 12 kids (Hope Center) on yesterday"
        );
        assert_eq!(DialogueController.summarize(&ActivityRecord::new()), "");
    }

    #[test]
    fn acknowledgment_lists_turn_findings() {
        let controller = DialogueController;
        let turn = ExtractionResult {
            name: Some("Sarah".to_string()),
            number_of_kids: Some(12),
            youth_house: Some("Hope Center".to_string()),
            ..ExtractionResult::default()
        };

        assert_eq!(
            controller.acknowledge(&turn),
            "Great! I got name: Sarah, 12 kids, organization: Hope Center. "
        );
        assert_eq!(controller.acknowledge(&ExtractionResult::default()), "Thanks for that! ");
    }

    #[test]
    fn save_messages_carry_position_and_reason() {
        let controller = DialogueController;
        assert!(controller.saved_message(&sarah_record(), 42).contains("row 42"));
        assert!(controller.saved_message(&sarah_record(), 42).contains("Thank you Sarah"));
        assert_eq!(
            controller.save_failed_message("sheet is read-only"),
            "Sorry, there was an error saving your activity: sheet is read-only. Please try again or contact support."
        );
    }

    #[test]
    fn affirmative_replies_are_recognized() {
        let controller = DialogueController;
        for reply in ["yes", "Yes!", "  sure ", "Please do.", "save it"] {
            assert!(controller.is_affirmative(reply), "{reply:?}");
        }
        for reply in ["no", "actually it was 14 kids", "", "not yet"] {
            assert!(!controller.is_affirmative(reply), "{reply:?}");
        }
    }
}
