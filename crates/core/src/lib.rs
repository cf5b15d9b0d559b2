pub mod config;
pub mod dialogue;
pub mod domain;
pub mod errors;
pub mod extraction;
pub mod flows;
pub mod slots;

pub use dialogue::DialogueController;
pub use domain::activity::{
    ActivityField, ActivityRecord, ActivityRow, ExtractionResult, MAX_KIDS, MIN_KIDS,
};
pub use errors::{ApplicationError, DomainError};
pub use extraction::{ExtractionMerger, FallbackExtractor, NameFilter, PatternExtractor};
pub use flows::{FlowAction, FlowEngine, FlowEvent, FlowState};
pub use slots::SlotTracker;
