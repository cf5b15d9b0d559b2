use serde::{Deserialize, Serialize};

use crate::domain::activity::ActivityField;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Collecting,
    AwaitingConfirmation,
    Logged,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    FieldsUpdated,
    RequiredFieldsCollected,
    SaveConfirmed,
    SaveFailed,
    StartNew,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FlowContext {
    pub missing_required_fields: Vec<ActivityField>,
}

impl FlowContext {
    pub fn with_missing(missing_required_fields: Vec<ActivityField>) -> Self {
        Self { missing_required_fields }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    PromptForMissingField,
    PromptForConfirmation,
    PersistActivity,
    ResetRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}
