use std::fmt;

use crate::diff::DiffKind;
use crate::event::{EventFields, EventId};
use crate::timezone::format_storage;

/// One schema-checked change proposed by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOperation {
    /// New event; the store assigns its id on commit.
    Add(EventFields),
    /// Full replacement of an existing event's mutable fields.
    Update { id: EventId, fields: EventFields },
    Delete { id: EventId },
}

impl DiffOperation {
    pub fn kind(&self) -> DiffKind {
        match self {
            DiffOperation::Add(_) => DiffKind::Add,
            DiffOperation::Update { .. } => DiffKind::Update,
            DiffOperation::Delete { .. } => DiffKind::Delete,
        }
    }

    pub fn id(&self) -> Option<&EventId> {
        match self {
            DiffOperation::Add(_) => None,
            DiffOperation::Update { id, .. } | DiffOperation::Delete { id } => Some(id),
        }
    }

    pub fn fields(&self) -> Option<&EventFields> {
        match self {
            DiffOperation::Add(fields) | DiffOperation::Update { fields, .. } => Some(fields),
            DiffOperation::Delete { .. } => None,
        }
    }
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiffOperation::Add(fields) => write!(
                f,
                "{} {} ({} -> {})",
                self.kind(),
                fields.title,
                format_storage(fields.start),
                format_storage(fields.end)
            ),
            DiffOperation::Update { id, fields } => write!(
                f,
                "{} [{}] {} ({} -> {})",
                self.kind(),
                id,
                fields.title,
                format_storage(fields.start),
                format_storage(fields.end)
            ),
            DiffOperation::Delete { id } => write!(f, "{} [{}]", self.kind(), id),
        }
    }
}

/// An operation tagged with its position in the generator's array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedOperation {
    pub index: usize,
    pub operation: DiffOperation,
}

impl IndexedOperation {
    pub fn new(index: usize, operation: DiffOperation) -> Self {
        IndexedOperation { index, operation }
    }
}
