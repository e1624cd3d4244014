//! Decoding of the generator's raw reply.
//!
//! The reply is untrusted. Its top level must be a bare JSON array or the
//! whole batch is refused. Inside the array each element is checked on its
//! own: a bad element becomes a rejection and the rest still parse.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::diff::{DiffKind, DiffOperation, IndexedOperation, Rejection};
use crate::error::{ParseError, RejectReason};
use crate::event::{EventFields, EventId, EventPriority, EventType};
use crate::timezone::TimeZoneNormalizer;

/// Result of decoding a reply: usable operations plus element-level rejections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedBatch {
    pub operations: Vec<IndexedOperation>,
    pub rejected: Vec<Rejection>,
}

pub struct DiffParser {
    tz: TimeZoneNormalizer,
}

impl DiffParser {
    pub fn new(tz: TimeZoneNormalizer) -> Self {
        DiffParser { tz }
    }

    pub fn parse(&self, raw: &str) -> Result<ParsedBatch, ParseError> {
        let trimmed = raw.trim();

        if !(trimmed.starts_with('[') && trimmed.ends_with(']')) {
            return Err(ParseError::MalformedResponse(
                "reply must be a bare JSON array".into(),
            ));
        }

        let value: Value = serde_json::from_str(trimmed)
            .map_err(|e| ParseError::MalformedResponse(format!("invalid JSON: {e}")))?;

        let Value::Array(items) = value else {
            return Err(ParseError::MalformedResponse(
                "reply must be a bare JSON array".into(),
            ));
        };

        let mut batch = ParsedBatch::default();
        // Ids already targeted by an update or delete in this batch.
        let mut targeted: HashSet<EventId> = HashSet::new();

        for (index, item) in items.iter().enumerate() {
            match self.parse_element(item) {
                Ok(operation) => {
                    if let Some(id) = operation.id() {
                        if !targeted.insert(id.clone()) {
                            batch.rejected.push(Rejection::new(
                                index,
                                Some(operation.kind()),
                                schema("id", "event already targeted earlier in this batch"),
                            ));
                            continue;
                        }
                    }
                    batch.operations.push(IndexedOperation::new(index, operation));
                }
                Err((kind, reason)) => batch.rejected.push(Rejection::new(index, kind, reason)),
            }
        }

        debug!(
            operations = batch.operations.len(),
            rejected = batch.rejected.len(),
            "Parsed generator reply"
        );

        Ok(batch)
    }

    fn parse_element(&self, item: &Value) -> Result<DiffOperation, (Option<DiffKind>, RejectReason)> {
        let Value::Object(obj) = item else {
            return Err((None, schema("action", "element is not an object")));
        };
        let element = Element { obj, tz: &self.tz };

        let action = element.required_str("action").map_err(|r| (None, r))?;
        let kind = DiffKind::from_action(&action.trim().to_ascii_lowercase())
            .ok_or_else(|| (None, RejectReason::UnknownAction(action.to_string())))?;

        let operation = match kind {
            DiffKind::Add => element.add(),
            DiffKind::Update => element.update(),
            DiffKind::Delete => element.delete(),
        };

        operation.map_err(|r| (Some(kind), r))
    }
}

fn schema(field: &str, reason: impl Into<String>) -> RejectReason {
    RejectReason::SchemaViolation {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// One array element being checked field by field.
struct Element<'a> {
    obj: &'a Map<String, Value>,
    tz: &'a TimeZoneNormalizer,
}

impl<'a> Element<'a> {
    /// `null` is treated the same as a missing field.
    fn get(&self, field: &str) -> Option<&'a Value> {
        self.obj.get(field).filter(|v| !v.is_null())
    }

    fn required_str(&self, field: &str) -> Result<&'a str, RejectReason> {
        match self.get(field) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(schema(field, "expected a string")),
            None => Err(schema(field, "missing")),
        }
    }

    fn optional_str(&self, field: &str) -> Result<Option<&'a str>, RejectReason> {
        match self.get(field) {
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(schema(field, "expected a string")),
            None => Ok(None),
        }
    }

    fn title(&self) -> Result<String, RejectReason> {
        let title = self.required_str("title")?.trim();
        if title.is_empty() {
            return Err(schema("title", "must not be empty"));
        }
        Ok(title.to_string())
    }

    fn instant(&self, field: &str) -> Result<DateTime<Utc>, RejectReason> {
        let raw = self.required_str(field)?;
        self.tz
            .parse_instant(raw)
            .map_err(|e| schema(field, e.to_string()))
    }

    /// Ids are strings; whole numbers are accepted and kept as their digits.
    fn id(&self) -> Result<EventId, RejectReason> {
        match self.get("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => Ok(EventId::new(s.trim())),
            Some(Value::String(_)) => Err(schema("id", "must not be empty")),
            Some(Value::Number(n)) if n.is_u64() => Ok(EventId::new(n.to_string())),
            Some(_) => Err(schema("id", "expected a string")),
            None => Err(schema("id", "missing")),
        }
    }

    fn event_type(&self, required: bool) -> Result<EventType, RejectReason> {
        match self.optional_str("type")? {
            Some(s) => EventType::parse(s)
                .ok_or_else(|| schema("type", format!("unknown type '{s}'"))),
            None if required => Err(schema("type", "missing")),
            None => Ok(EventType::default()),
        }
    }

    fn priority(&self, required: bool) -> Result<EventPriority, RejectReason> {
        match self.optional_str("priority")? {
            Some(s) => EventPriority::parse(s)
                .ok_or_else(|| schema("priority", format!("unknown priority '{s}'"))),
            None if required => Err(schema("priority", "missing")),
            None => Ok(EventPriority::default()),
        }
    }

    fn fields(&self, required: bool) -> Result<EventFields, RejectReason> {
        Ok(EventFields {
            title: self.title()?,
            start: self.instant("start")?,
            end: self.instant("end")?,
            event_type: self.event_type(required)?,
            priority: self.priority(required)?,
            location: self.optional_str("location")?.map(str::to_string),
        })
    }

    fn add(&self) -> Result<DiffOperation, RejectReason> {
        if self.get("id").is_some() {
            return Err(schema("id", "add operations must not carry an id"));
        }
        Ok(DiffOperation::Add(self.fields(false)?))
    }

    fn update(&self) -> Result<DiffOperation, RejectReason> {
        let id = self.id()?;
        Ok(DiffOperation::Update {
            id,
            fields: self.fields(true)?,
        })
    }

    fn delete(&self) -> Result<DiffOperation, RejectReason> {
        Ok(DiffOperation::Delete { id: self.id()? })
    }
}
