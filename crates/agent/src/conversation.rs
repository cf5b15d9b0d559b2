use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use vlog_core::config::AppConfig;
use vlog_core::domain::activity::{ActivityField, ActivityRecord, ActivityRow, ExtractionResult};
use vlog_core::errors::{ApplicationError, DomainError};
use vlog_core::extraction::{ExtractionMerger, NameFilter, PatternExtractor};
use vlog_core::flows::{
    ActivityLogFlow, FlowAction, FlowContext, FlowEngine, FlowEvent, FlowState,
};
use vlog_core::{DialogueController, SlotTracker};
use vlog_db::ActivityStore;

use crate::classifier::RemoteClassifier;

/// Runs every extraction strategy over one utterance and merges them.
#[derive(Clone)]
pub struct ExtractionPipeline {
    patterns: PatternExtractor,
    classifier: RemoteClassifier,
    merger: ExtractionMerger,
}

impl Default for ExtractionPipeline {
    fn default() -> Self {
        Self::new(RemoteClassifier::unavailable())
    }
}

impl ExtractionPipeline {
    pub fn new(classifier: RemoteClassifier) -> Self {
        Self::with_name_filter(classifier, NameFilter::default())
    }

    pub fn with_name_filter(classifier: RemoteClassifier, names: NameFilter) -> Self {
        Self {
            patterns: PatternExtractor::with_name_filter(names.clone()),
            classifier,
            merger: ExtractionMerger::with_name_filter(names),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(RemoteClassifier::from_config(&config.classifier))
    }

    pub fn remote_available(&self) -> bool {
        self.classifier.is_available()
    }

    /// Extracts whatever the utterance mentions. Earlier turns are accepted
    /// for tracing only; extraction looks at the current text alone.
    pub async fn submit_utterance(
        &self,
        text: &str,
        prior_turns: &[String],
        expected: Option<ActivityField>,
    ) -> ExtractionResult {
        let pattern = self.patterns.extract(text);
        let remote = self.classifier.classify(text).await;
        let merged = self.merger.merge_with_hint(&pattern, &remote, text, expected);

        debug!(
            event_name = "extraction.utterance_processed",
            prior_turns = prior_turns.len(),
            pattern_fields = pattern.filled_fields().len(),
            remote_fields = remote.filled_fields().len(),
            merged_fields = merged.filled_fields().len(),
            "utterance extracted"
        );
        merged
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct TurnReply {
    pub message: String,
    /// All six fields are filled and the record awaits confirmation.
    pub complete: bool,
    pub state: FlowState,
    pub extracted: ExtractionResult,
    pub record: ActivityRecord,
    pub saved_position: Option<i64>,
}

struct SessionState {
    record: ActivityRecord,
    turns: Vec<String>,
    pending_field: Option<ActivityField>,
    flow_state: FlowState,
}

/// One volunteer's conversation. Turns are serialized by the inner lock.
pub struct ConversationSession {
    pipeline: ExtractionPipeline,
    flow: FlowEngine<ActivityLogFlow>,
    slots: SlotTracker,
    dialogue: DialogueController,
    state: Mutex<SessionState>,
}

impl ConversationSession {
    pub fn new(pipeline: ExtractionPipeline) -> Self {
        let flow = FlowEngine::default();
        let flow_state = flow.initial_state();
        Self {
            pipeline,
            flow,
            slots: SlotTracker,
            dialogue: DialogueController,
            state: Mutex::new(SessionState {
                record: ActivityRecord::new(),
                turns: Vec::new(),
                pending_field: None,
                flow_state,
            }),
        }
    }

    pub fn opening_prompt(&self) -> String {
        self.dialogue.next_question(&ActivityField::ALL, &ActivityRecord::new())
    }

    pub async fn record(&self) -> ActivityRecord {
        self.state.lock().await.record.clone()
    }

    pub async fn flow_state(&self) -> FlowState {
        self.state.lock().await.flow_state
    }

    /// Processes one user message. While a complete record awaits
    /// confirmation, an affirmative reply saves it to `store`.
    pub async fn handle_utterance(&self, text: &str, store: &dyn ActivityStore) -> TurnReply {
        let mut state = self.state.lock().await;

        if state.flow_state == FlowState::AwaitingConfirmation && self.dialogue.is_affirmative(text)
        {
            return self.save_turn(&mut state, store).await;
        }

        if state.flow_state == FlowState::Logged {
            self.advance(&mut state, FlowEvent::StartNew, Vec::new());
        }

        let extracted = self
            .pipeline
            .submit_utterance(text, &state.turns, state.pending_field)
            .await;
        state.turns.push(text.to_string());
        state.record.absorb(&extracted);

        let missing = self.slots.missing_fields(&state.record);
        let event = if missing.is_empty() {
            FlowEvent::RequiredFieldsCollected
        } else {
            FlowEvent::FieldsUpdated
        };
        self.advance(&mut state, event, missing.clone());

        let complete = missing.is_empty();
        let message = if complete {
            state.pending_field = None;
            self.dialogue.completion_prompt(&state.record)
        } else {
            state.pending_field = self.dialogue.next_field(&missing);
            format!(
                "{}{}",
                self.dialogue.acknowledge(&extracted),
                self.dialogue.next_question(&missing, &state.record)
            )
        };

        info!(
            event_name = "conversation.turn.completed",
            turn = state.turns.len(),
            filled = self.slots.completed_count(&state.record),
            complete,
            "conversation turn completed"
        );

        TurnReply {
            message,
            complete,
            state: state.flow_state,
            extracted,
            record: state.record.clone(),
            saved_position: None,
        }
    }

    /// Appends the complete record and starts a fresh one. On failure the
    /// record is kept so the user can retry.
    pub async fn confirm(&self, store: &dyn ActivityStore) -> Result<i64, ApplicationError> {
        let mut state = self.state.lock().await;
        self.persist(&mut state, store).await.map(|(position, _)| position)
    }

    /// Discards the current record and returns the fresh-start prompt.
    pub async fn reset(&self) -> String {
        let mut state = self.state.lock().await;
        self.advance(&mut state, FlowEvent::StartNew, Vec::new());
        self.dialogue.fresh_start_prompt().to_string()
    }

    pub fn fresh_start_prompt(&self) -> &'static str {
        self.dialogue.fresh_start_prompt()
    }

    async fn save_turn(&self, state: &mut SessionState, store: &dyn ActivityStore) -> TurnReply {
        let (message, saved_position) = match self.persist(state, store).await {
            Ok((position, saved)) => (self.dialogue.saved_message(&saved, position), Some(position)),
            Err(error) => (error.user_message(), None),
        };

        TurnReply {
            message,
            complete: saved_position.is_none(),
            state: state.flow_state,
            extracted: ExtractionResult::default(),
            record: state.record.clone(),
            saved_position,
        }
    }

    /// Returns the row position and the record as it was saved.
    async fn persist(
        &self,
        state: &mut SessionState,
        store: &dyn ActivityStore,
    ) -> Result<(i64, ActivityRecord), ApplicationError> {
        let missing = self.slots.missing_fields(&state.record);
        if !missing.is_empty() {
            return Err(DomainError::IncompleteRecord { missing }.into());
        }

        let context = FlowContext::default();
        let outcome = self
            .flow
            .apply(&state.flow_state, &FlowEvent::SaveConfirmed, &context)
            .map_err(DomainError::from)?;
        let row = ActivityRow::from_record(&state.record, chrono::Utc::now())?;

        match store.append(&row).await {
            Ok(position) => {
                let saved = state.record.clone();
                self.apply_actions(state, &outcome.actions);
                state.flow_state = outcome.to;
                info!(
                    event_name = "conversation.activity_saved",
                    position,
                    "activity saved to the log"
                );
                Ok((position, saved))
            }
            Err(error) => {
                warn!(
                    event_name = "conversation.save_failed",
                    error = %error,
                    "activity could not be saved; keeping record for retry"
                );
                self.advance(state, FlowEvent::SaveFailed, Vec::new());
                Err(ApplicationError::Persistence(error.to_string()))
            }
        }
    }

    fn advance(&self, state: &mut SessionState, event: FlowEvent, missing: Vec<ActivityField>) {
        let context = FlowContext::with_missing(missing);
        match self.flow.apply(&state.flow_state, &event, &context) {
            Ok(outcome) => {
                self.apply_actions(state, &outcome.actions);
                state.flow_state = outcome.to;
            }
            Err(error) => warn!(
                event_name = "conversation.transition_skipped",
                error = %error,
                "flow transition rejected; keeping current state"
            ),
        }
    }

    fn apply_actions(&self, state: &mut SessionState, actions: &[FlowAction]) {
        if actions.contains(&FlowAction::ResetRecord) {
            state.record.reset();
            state.turns.clear();
            state.pending_field = None;
        }
    }
}
