use thiserror::Error;

use crate::domain::activity::ActivityField;
use crate::flows::FlowTransitionError;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("activity record is incomplete, missing: {}", render_fields(.missing))]
    IncompleteRecord { missing: Vec<ActivityField> },
    #[error(transparent)]
    FlowTransition(#[from] FlowTransitionError),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Text shown to the volunteer. Persistence reasons are passed through
    /// verbatim so the user can decide whether to retry.
    pub fn user_message(&self) -> String {
        match self {
            Self::Domain(DomainError::IncompleteRecord { missing }) => format!(
                "I still need a few details before saving: {}.",
                render_fields(missing)
            ),
            Self::Domain(_) => {
                "That request could not be processed. Please check the details and try again."
                    .to_string()
            }
            Self::Persistence(reason) => format!(
                "Sorry, there was an error saving your activity: {reason}. Please try again or contact support."
            ),
            Self::Configuration(_) => "An unexpected internal error occurred.".to_string(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

fn render_fields(fields: &[ActivityField]) -> String {
    fields.iter().map(ActivityField::key).collect::<Vec<_>>().join(", ")
}
