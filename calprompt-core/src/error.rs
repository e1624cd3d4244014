//! Error types for calprompt.
//!
//! `CalPromptError` covers infrastructure failures that abort a whole batch.
//! Per-operation problems are not errors in this sense; they end up as
//! `RejectReason`s in the batch report.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::event::EventId;

/// Errors that can occur in calprompt operations.
#[derive(Error, Debug)]
pub enum CalPromptError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Generator error: {0}")]
    Generator(String),

    #[error("Generator '{0}' not found in PATH")]
    GeneratorNotInstalled(String),

    #[error("Generator request timed out after {}", humantime::format_duration(*.0))]
    GeneratorTimeout(Duration),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for CalPromptError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for calprompt operations.
pub type CalPromptResult<T> = Result<T, CalPromptError>;

/// A string that does not describe a valid instant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timestamp '{input}'")]
pub struct TimestampError {
    pub input: String,
}

/// Batch-fatal problems with the generator's reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// A scheduling rule an operation broke.
///
/// Variants are listed in the order the validator checks them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    InvalidOrdering,
    Overlap { with: String },
    Window { window: String },
    BusinessHours,
    QuietHours,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::InvalidOrdering => write!(f, "start is not before end"),
            Violation::Overlap { with } => write!(f, "overlap with existing event '{with}'"),
            Violation::Window { window } => write!(f, "start outside the {window} window"),
            Violation::BusinessHours => write!(f, "personal event during business hours"),
            Violation::QuietHours => write!(f, "start during quiet hours"),
        }
    }
}

/// Why a single operation was dropped from a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    UnknownAction(String),
    SchemaViolation { field: String, reason: String },
    Violation(Violation),
    UnknownReference(EventId),
    PersistenceFailure(String),
}

impl RejectReason {
    /// Stable rule name, used in logs and reports.
    pub fn rule(&self) -> &'static str {
        match self {
            RejectReason::UnknownAction(_) => "UnknownAction",
            RejectReason::SchemaViolation { .. } => "SchemaViolation",
            RejectReason::Violation(Violation::InvalidOrdering) => "InvalidOrdering",
            RejectReason::Violation(Violation::Overlap { .. }) => "OverlapViolation",
            RejectReason::Violation(Violation::Window { .. }) => "WindowViolation",
            RejectReason::Violation(Violation::BusinessHours) => "BusinessHourViolation",
            RejectReason::Violation(Violation::QuietHours) => "QuietHourViolation",
            RejectReason::UnknownReference(_) => "UnknownReference",
            RejectReason::PersistenceFailure(_) => "PersistenceFailure",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::UnknownAction(action) => write!(f, "unknown action '{action}'"),
            RejectReason::SchemaViolation { field, reason } => {
                write!(f, "invalid field '{field}': {reason}")
            }
            RejectReason::Violation(v) => v.fmt(f),
            RejectReason::UnknownReference(id) => write!(f, "no event with id '{id}'"),
            RejectReason::PersistenceFailure(msg) => write!(f, "store rejected change: {msg}"),
        }
    }
}

impl From<Violation> for RejectReason {
    fn from(v: Violation) -> Self {
        RejectReason::Violation(v)
    }
}
