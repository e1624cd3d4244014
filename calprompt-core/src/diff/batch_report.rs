//! Outcome of one reconciliation batch.

use std::fmt;

use crate::diff::DiffKind;
use crate::error::RejectReason;
use crate::event::CalendarEvent;

/// An operation that made it into the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub index: usize,
    pub kind: DiffKind,
    /// The event as committed. For deletes, the removed event; `None` when
    /// the delete targeted an id that was already gone.
    pub event: Option<CalendarEvent>,
}

/// An operation dropped from the batch, with the single rule it broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub index: usize,
    /// Unknown when the element was too broken to tell.
    pub kind: Option<DiffKind>,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn new(index: usize, kind: Option<DiffKind>, reason: RejectReason) -> Self {
        Rejection {
            index,
            kind,
            reason,
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "#{} {}: {}", self.index, kind.action(), self.reason),
            None => write!(f, "#{}: {}", self.index, self.reason),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub applied: Vec<Applied>,
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.rejected.is_empty()
    }

    /// Rejections sorted back into the generator's original order.
    pub fn rejections(&self) -> Vec<&Rejection> {
        let mut rejected: Vec<_> = self.rejected.iter().collect();
        rejected.sort_by_key(|r| r.index);
        rejected
    }

    /// (added, updated, deleted) among applied operations.
    pub fn applied_counts(&self) -> (usize, usize, usize) {
        let mut added = 0;
        let mut updated = 0;
        let mut deleted = 0;

        for applied in &self.applied {
            match applied.kind {
                DiffKind::Add => added += 1,
                DiffKind::Update => updated += 1,
                DiffKind::Delete => deleted += 1,
            }
        }

        (added, updated, deleted)
    }

    /// One-line summary, e.g. "3 applied, 1 rejected: overlap with existing event 'Gym'".
    pub fn summary(&self) -> String {
        let head = format!(
            "{} applied, {} rejected",
            self.applied.len(),
            self.rejected.len()
        );

        if self.rejected.is_empty() {
            return head;
        }

        let reasons: Vec<String> = self
            .rejections()
            .iter()
            .map(|r| r.reason.to_string())
            .collect();
        format!("{head}: {}", reasons.join("; "))
    }
}
