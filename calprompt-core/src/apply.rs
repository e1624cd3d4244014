//! Commits validated operations to the store and the in-memory snapshot.
//!
//! The store is written first. Only when it accepts the change does the
//! snapshot follow, so a failed write never leaves the two out of step.

use tracing::debug;

use crate::diff::{Applied, DiffOperation};
use crate::error::RejectReason;
use crate::event::{CalendarEvent, EventFields, Snapshot};
use crate::store::EventStore;

pub struct DiffApplier<'a> {
    store: &'a dyn EventStore,
}

impl<'a> DiffApplier<'a> {
    pub fn new(store: &'a dyn EventStore) -> Self {
        DiffApplier { store }
    }

    pub async fn apply(
        &self,
        index: usize,
        operation: &DiffOperation,
        snapshot: &mut Snapshot,
    ) -> Result<Applied, RejectReason> {
        let kind = operation.kind();

        let event = match operation {
            DiffOperation::Add(fields) => {
                let event = self.store.create(fields).await.map_err(persistence)?;
                snapshot.insert(event.clone());
                Some(event)
            }
            DiffOperation::Update { id, fields } => {
                let existing = snapshot
                    .get(id)
                    .ok_or_else(|| RejectReason::UnknownReference(id.clone()))?;

                let merged = merge_location(fields, &existing.fields);
                self.store.update(id, &merged).await.map_err(persistence)?;

                let event = CalendarEvent::new(id.clone(), merged);
                snapshot.insert(event.clone());
                Some(event)
            }
            DiffOperation::Delete { id } => {
                if !snapshot.contains(id) {
                    debug!(%id, "Delete of absent event, nothing to do");
                    None
                } else {
                    self.store.delete(id).await.map_err(persistence)?;
                    snapshot.remove(id)
                }
            }
        };

        debug!(index, %kind, "Applied operation");

        Ok(Applied { index, kind, event })
    }
}

/// Updates replace every field, except that a missing location keeps the
/// one already stored.
fn merge_location(update: &EventFields, existing: &EventFields) -> EventFields {
    let mut merged = update.clone();
    if merged.location.is_none() {
        merged.location = existing.location.clone();
    }
    merged
}

fn persistence(err: crate::error::CalPromptError) -> RejectReason {
    RejectReason::PersistenceFailure(err.to_string())
}
