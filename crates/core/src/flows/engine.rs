use thiserror::Error;
use tracing::debug;

use crate::domain::activity::ActivityField;
use crate::flows::states::{FlowAction, FlowContext, FlowEvent, FlowState, TransitionOutcome};

pub trait FlowDefinition {
    fn initial_state(&self) -> FlowState;
    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

/// Collect six slots, confirm, append, start over.
#[derive(Clone, Debug, Default)]
pub struct ActivityLogFlow;

impl FlowDefinition for ActivityLogFlow {
    fn initial_state(&self) -> FlowState {
        FlowState::Collecting
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_activity_log(current, event, context)
    }
}

#[derive(Clone, Debug)]
pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn initial_state(&self) -> FlowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        let result = self.flow.transition(current, event, context);
        match &result {
            Ok(outcome) => debug!(
                event_name = "flow.transition_applied",
                from = ?outcome.from,
                to = ?outcome.to,
                flow_event = ?outcome.event,
                "conversation flow transition applied"
            ),
            Err(error) => debug!(
                event_name = "flow.transition_rejected",
                error = %error,
                "conversation flow transition rejected"
            ),
        }
        result
    }
}

impl Default for FlowEngine<ActivityLogFlow> {
    fn default() -> Self {
        Self::new(ActivityLogFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("missing required fields before transition from {state:?}: {missing_fields:?}")]
    MissingRequiredFields { state: FlowState, missing_fields: Vec<ActivityField> },
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
}

fn transition_activity_log(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{PersistActivity, PromptForConfirmation, PromptForMissingField, ResetRecord};
    use FlowEvent::{FieldsUpdated, RequiredFieldsCollected, SaveConfirmed, SaveFailed, StartNew};
    use FlowState::{AwaitingConfirmation, Collecting, Logged};

    let (to, actions) = match (current, event) {
        (Collecting, FieldsUpdated) => (Collecting, vec![PromptForMissingField]),
        (Collecting, RequiredFieldsCollected) | (AwaitingConfirmation, RequiredFieldsCollected) => {
            if !context.missing_required_fields.is_empty() {
                return Err(FlowTransitionError::MissingRequiredFields {
                    state: *current,
                    missing_fields: context.missing_required_fields.clone(),
                });
            }
            (AwaitingConfirmation, vec![PromptForConfirmation])
        }
        // Fills are monotonic: a complete record stays complete.
        (AwaitingConfirmation, FieldsUpdated) => {
            (AwaitingConfirmation, vec![PromptForConfirmation])
        }
        (AwaitingConfirmation, SaveConfirmed) => (Logged, vec![PersistActivity, ResetRecord]),
        (AwaitingConfirmation, SaveFailed) => (AwaitingConfirmation, vec![PromptForConfirmation]),
        (Logged, StartNew) | (Collecting, StartNew) | (AwaitingConfirmation, StartNew) => {
            (Collecting, vec![ResetRecord, PromptForMissingField])
        }
        (Logged, FieldsUpdated) => (Collecting, vec![PromptForMissingField]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}
