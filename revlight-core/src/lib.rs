//! Revlight Core - Core library for Revlight code review annotations
//!
//! This crate provides the feedback data model, the renderer that maps
//! feedback onto editor buffers, the poll policy used by backend clients,
//! and the coordinator that drives a submit → poll → render sequence.

pub mod buffer;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod feedback;
pub mod poll;
pub mod render;

pub use buffer::{BufferId, EditorBuffer, Highlight, NotifyLevel};
pub use config::{BackendConfig, Config, HighlightConfig};
pub use coordinator::{ReviewBackend, ReviewCoordinator, ReviewOutcome};
pub use error::{Error, Result};
pub use feedback::{parse_feedback, FeedbackItem, Severity, SubmissionId};
pub use poll::{Backoff, PollPolicy};
pub use render::{render, SeverityStyle, StyleRegistry};
