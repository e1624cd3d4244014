use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{CalPromptError, CalPromptResult};
use crate::event::{CalendarEvent, EventFields, EventId};
use crate::store::EventStore;

/// In-process store with sequential numeric ids.
///
/// `fail_next` makes the next N mutating calls fail, for exercising the
/// persistence-failure path.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<BTreeMap<EventId, CalendarEvent>>,
    last_id: AtomicU64,
    failures: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `events`. New ids continue after the largest
    /// numeric id present.
    pub fn with_events(events: impl IntoIterator<Item = CalendarEvent>) -> Self {
        let events: BTreeMap<_, _> = events.into_iter().map(|e| (e.id.clone(), e)).collect();
        let last_id = events
            .keys()
            .filter_map(|id| id.as_str().parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        MemoryStore {
            events: Mutex::new(events),
            last_id: AtomicU64::new(last_id),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> CalPromptResult<()> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(CalPromptError::Store("injected failure".into()));
        }
        Ok(())
    }

    fn lock(&self) -> CalPromptResult<std::sync::MutexGuard<'_, BTreeMap<EventId, CalendarEvent>>> {
        self.events
            .lock()
            .map_err(|_| CalPromptError::Store("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create(&self, fields: &EventFields) -> CalPromptResult<CalendarEvent> {
        self.take_failure()?;
        let id = EventId::new((self.last_id.fetch_add(1, Ordering::SeqCst) + 1).to_string());
        let event = CalendarEvent::new(id.clone(), fields.clone());
        self.lock()?.insert(id, event.clone());
        Ok(event)
    }

    async fn update(&self, id: &EventId, fields: &EventFields) -> CalPromptResult<()> {
        self.take_failure()?;
        let mut events = self.lock()?;
        let event = events
            .get_mut(id)
            .ok_or_else(|| CalPromptError::Store(format!("no event with id '{id}'")))?;
        event.fields = fields.clone();
        Ok(())
    }

    async fn delete(&self, id: &EventId) -> CalPromptResult<()> {
        self.take_failure()?;
        self.lock()?.remove(id);
        Ok(())
    }

    async fn list_all(&self) -> CalPromptResult<Vec<CalendarEvent>> {
        Ok(self.lock()?.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fields(title: &str) -> EventFields {
        EventFields::new(
            title,
            Utc.with_ymd_and_hms(2025, 7, 1, 22, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 7, 1, 23, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn ids_continue_after_seeded_events() {
        let seeded = CalendarEvent::new(EventId::from("41"), fields("Seed"));
        let store = MemoryStore::with_events(vec![seeded]);

        let created = store.create(&fields("New")).await.unwrap();
        assert_eq!(created.id, EventId::from("42"));
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn injected_failures_are_consumed_in_order() {
        let store = MemoryStore::new();
        store.fail_next(1);

        assert!(store.create(&fields("A")).await.is_err());
        assert!(store.create(&fields("B")).await.is_ok());
        assert_eq!(store.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_of_unknown_id_fails() {
        let store = MemoryStore::new();
        assert!(store.update(&EventId::from("9"), &fields("X")).await.is_err());
    }
}
