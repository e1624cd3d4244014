pub mod apply;
pub mod ask;
pub mod config;
pub mod context;
pub mod events;

use std::sync::Arc;

use anyhow::{Context, Result};
use calprompt_core::config::CalPromptConfig;
use calprompt_core::session::ReconciliationSession;
use calprompt_core::store::{EventStore, JsonFileStore};

/// Session over the configured event file.
pub async fn open_session(config: &CalPromptConfig) -> Result<ReconciliationSession> {
    let store: Arc<dyn EventStore> = Arc::new(JsonFileStore::new(config.store_path()));
    let settings = config.session_settings()?;

    ReconciliationSession::load(store, settings)
        .await
        .with_context(|| format!("Could not read events from {}", config.store_path().display()))
}
