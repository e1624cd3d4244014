//! Core types for calprompt.
//!
//! This crate turns a free-text calendar request into validated event changes:
//! - `intent` normalizes the request text into a `NormalizedIntent`
//! - `context` renders the prompt handed to a `Generator`
//! - `diff` parses the generator's reply into typed `DiffOperation`s
//! - `validate` enforces the scheduling rules, `apply` commits what passes
//! - `session` owns the event snapshot and runs the pipeline end to end

pub mod apply;
pub mod config;
pub mod context;
pub mod diff;
pub mod error;
pub mod event;
pub mod generator;
pub mod intent;
pub mod session;
pub mod store;
pub mod timezone;
pub mod validate;

pub use error::{CalPromptError, CalPromptResult};
pub use event::{CalendarEvent, EventFields, EventId, EventPriority, EventType, Snapshot};
pub use session::{BatchReport, ReconciliationSession};
