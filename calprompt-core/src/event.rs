//! The canonical event record and the session snapshot.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity assigned by the store when an event is created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(String);

impl EventId {
    pub fn new(id: impl Into<String>) -> Self {
        EventId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EventId {
    fn from(s: &str) -> Self {
        EventId(s.to_string())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Work,
    #[default]
    Personal,
    Reminder,
}

impl EventType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Work" => Some(EventType::Work),
            "Personal" => Some(EventType::Personal),
            "Reminder" => Some(EventType::Reminder),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Work => "Work",
            EventType::Personal => "Personal",
            EventType::Reminder => "Reminder",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventPriority {
    Urgent,
    #[default]
    Normal,
}

impl EventPriority {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Urgent" => Some(EventPriority::Urgent),
            "Normal" => Some(EventPriority::Normal),
            _ => None,
        }
    }
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventPriority::Urgent => "Urgent",
            EventPriority::Normal => "Normal",
        };
        f.write_str(name)
    }
}

/// Everything about an event except its identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventFields {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default)]
    pub priority: EventPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl EventFields {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        EventFields {
            title: title.into(),
            start,
            end,
            event_type: EventType::default(),
            priority: EventPriority::default(),
            location: None,
        }
    }

    pub fn with_type(mut self, event_type: EventType) -> Self {
        self.event_type = event_type;
        self
    }

    pub fn with_priority(mut self, priority: EventPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Half-open interval overlap: touching endpoints do not count.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && start < self.end
    }
}

/// A calendar event as known to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub fields: EventFields,
}

impl CalendarEvent {
    pub fn new(id: EventId, fields: EventFields) -> Self {
        CalendarEvent { id, fields }
    }
}

impl fmt::Display for CalendarEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields.title)
    }
}

/// The events one reconciliation session works against, keyed by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    events: HashMap<EventId, CalendarEvent>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &EventId) -> Option<&CalendarEvent> {
        self.events.get(id)
    }

    pub fn contains(&self, id: &EventId) -> bool {
        self.events.contains_key(id)
    }

    pub fn insert(&mut self, event: CalendarEvent) {
        self.events.insert(event.id.clone(), event);
    }

    pub fn remove(&mut self, id: &EventId) -> Option<CalendarEvent> {
        self.events.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CalendarEvent> {
        self.events.values()
    }

    /// Events ordered by start, then id, for stable rendering.
    pub fn sorted(&self) -> Vec<&CalendarEvent> {
        let mut events: Vec<_> = self.events.values().collect();
        events.sort_by(|a, b| {
            a.fields
                .start
                .cmp(&b.fields.start)
                .then_with(|| a.id.cmp(&b.id))
        });
        events
    }

    /// First event (by start) whose interval overlaps `[start, end)`,
    /// ignoring `exclude`.
    pub fn find_overlap(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude: Option<&EventId>,
    ) -> Option<&CalendarEvent> {
        self.sorted()
            .into_iter()
            .filter(|e| Some(&e.id) != exclude)
            .find(|e| e.fields.overlaps(start, end))
    }

    /// True when no two events overlap.
    pub fn is_overlap_free(&self) -> bool {
        let events = self.sorted();
        events
            .windows(2)
            .all(|pair| pair[0].fields.end <= pair[1].fields.start)
    }
}

impl FromIterator<CalendarEvent> for Snapshot {
    fn from_iter<I: IntoIterator<Item = CalendarEvent>>(iter: I) -> Self {
        Snapshot {
            events: iter.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, h, m, 0).unwrap()
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent::new(EventId::from(id), EventFields::new(id, start, end))
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let fields = EventFields::new("A", at(10, 0), at(11, 0));
        assert!(!fields.overlaps(at(11, 0), at(12, 0)));
        assert!(!fields.overlaps(at(9, 0), at(10, 0)));
        assert!(fields.overlaps(at(10, 59), at(12, 0)));
        assert!(fields.overlaps(at(9, 0), at(13, 0)));
    }

    #[test]
    fn find_overlap_skips_excluded_event() {
        let snapshot: Snapshot = vec![event("1", at(10, 0), at(11, 0))].into_iter().collect();

        assert!(snapshot.find_overlap(at(10, 30), at(11, 30), None).is_some());
        assert!(
            snapshot
                .find_overlap(at(10, 30), at(11, 30), Some(&EventId::from("1")))
                .is_none()
        );
    }

    #[test]
    fn sorted_orders_by_start_then_id() {
        let snapshot: Snapshot = vec![
            event("b", at(9, 0), at(9, 30)),
            event("c", at(8, 0), at(8, 30)),
            event("a", at(9, 0), at(9, 15)),
        ]
        .into_iter()
        .collect();

        let ids: Vec<_> = snapshot.sorted().iter().map(|e| e.id.to_string()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn overlap_free_detects_conflicts() {
        let mut snapshot: Snapshot = vec![
            event("1", at(8, 0), at(9, 0)),
            event("2", at(9, 0), at(10, 0)),
        ]
        .into_iter()
        .collect();
        assert!(snapshot.is_overlap_free());

        snapshot.insert(event("3", at(9, 30), at(9, 45)));
        assert!(!snapshot.is_overlap_free());
    }

    #[test]
    fn event_serializes_with_type_key_and_defaults() {
        let json = r#"{"id":"7","title":"Gym","start":"2025-07-01T10:00:00Z","end":"2025-07-01T11:00:00Z"}"#;
        let event: CalendarEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.fields.event_type, EventType::Personal);
        assert_eq!(event.fields.priority, EventPriority::Normal);

        let out = serde_json::to_value(&event).unwrap();
        assert_eq!(out["type"], "Personal");
        assert!(out.get("location").is_none());
    }
}
