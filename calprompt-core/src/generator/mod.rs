//! The generation collaborator.
//!
//! A generator turns a `GenerationRequest` into raw text that is expected to
//! be a JSON array of change operations. Nothing it returns is trusted; the
//! reply goes straight to `DiffParser`.

mod chat;
mod command;

pub use chat::{ChatGenerator, DEFAULT_API_URL, DEFAULT_MODEL};
pub use command::CommandGenerator;

use async_trait::async_trait;

use crate::context::GenerationRequest;
use crate::error::CalPromptResult;

#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> CalPromptResult<String>;
}
