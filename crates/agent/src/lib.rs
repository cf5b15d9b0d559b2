//! Conversation runtime for the volunteer activity log.
//!
//! This crate turns free-text messages into a filled activity record:
//! - Runs the local pattern extractors and the optional remote classifier
//!   over each message and merges them (`conversation`)
//! - Talks to hosted inference models (`inference`, `classifier`)
//! - Tracks per-conversation state and asks for what is still missing
//! - Appends confirmed records to the activity store (`runtime`)
//!
//! # Key Types
//!
//! - `AgentRuntime` - owns the store and the session table
//! - `ConversationSession` - one volunteer's record and flow state
//! - `RemoteClassifier` - concurrent NER, generation and zero-shot calls
//!
//! The remote classifier only suggests values. A turn always completes,
//! even when every remote call fails.

pub mod classifier;
pub mod conversation;
pub mod inference;
pub mod runtime;

pub use classifier::{ClassifierSettings, RemoteClassifier, ACTIVITY_LABELS};
pub use conversation::{ConversationSession, ExtractionPipeline, TurnReply};
pub use inference::{HuggingFaceBackend, InferenceBackend, InferenceError};
pub use runtime::{AgentError, AgentRuntime, SessionId};
