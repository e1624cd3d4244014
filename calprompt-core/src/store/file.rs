use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{CalPromptError, CalPromptResult};
use crate::event::{CalendarEvent, EventFields, EventId};
use crate::store::EventStore;

/// Events kept as a pretty-printed JSON array in a single file.
///
/// Every mutation rewrites the whole file. A missing file reads as an empty
/// calendar; parent directories are created on first write.
pub struct JsonFileStore {
    path: PathBuf,
    // Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> CalPromptResult<Vec<CalendarEvent>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&content).map_err(|e| {
            CalPromptError::Store(format!("Could not parse {}: {e}", self.path.display()))
        })
    }

    async fn write(&self, events: &[CalendarEvent]) -> CalPromptResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    CalPromptError::Store(format!("Could not create store directory: {e}"))
                })?;
            }
        }

        let content = serde_json::to_string_pretty(events)?;
        tokio::fs::write(&self.path, content).await.map_err(|e| {
            CalPromptError::Store(format!("Could not write {}: {e}", self.path.display()))
        })
    }
}

#[async_trait]
impl EventStore for JsonFileStore {
    async fn create(&self, fields: &EventFields) -> CalPromptResult<CalendarEvent> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.read().await?;

        let event = CalendarEvent::new(
            EventId::new(uuid::Uuid::new_v4().to_string()),
            fields.clone(),
        );
        events.push(event.clone());

        self.write(&events).await?;
        Ok(event)
    }

    async fn update(&self, id: &EventId, fields: &EventFields) -> CalPromptResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.read().await?;

        let event = events
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(|| CalPromptError::Store(format!("no event with id '{id}'")))?;
        event.fields = fields.clone();

        self.write(&events).await
    }

    async fn delete(&self, id: &EventId) -> CalPromptResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut events = self.read().await?;

        events.retain(|e| &e.id != id);

        self.write(&events).await
    }

    async fn list_all(&self) -> CalPromptResult<Vec<CalendarEvent>> {
        self.read().await
    }
}
