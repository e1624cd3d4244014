//! The persistence collaborator.
//!
//! The core only needs create/update/delete by id plus a full listing to
//! seed a session. Failures are opaque beyond success or failure.

mod file;
mod memory;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::error::CalPromptResult;
use crate::event::{CalendarEvent, EventFields, EventId};

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new event and return it with its assigned id.
    async fn create(&self, fields: &EventFields) -> CalPromptResult<CalendarEvent>;

    async fn update(&self, id: &EventId, fields: &EventFields) -> CalPromptResult<()>;

    async fn delete(&self, id: &EventId) -> CalPromptResult<()>;

    async fn list_all(&self) -> CalPromptResult<Vec<CalendarEvent>>;
}
