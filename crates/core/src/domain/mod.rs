pub mod activity;

pub use activity::{
    accept_kid_count, ActivityField, ActivityRecord, ActivityRow, ExtractionResult, MAX_KIDS,
    MIN_KIDS,
};
