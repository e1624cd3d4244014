use anyhow::Result;
use calprompt_core::config::CalPromptConfig;
use owo_colors::OwoColorize;

use crate::render::render_event;

pub async fn run(config: &CalPromptConfig) -> Result<()> {
    let session = super::open_session(config).await?;
    let tz = session.settings().tz;
    let events = session.snapshot().sorted();

    if events.is_empty() {
        println!("{}", "No events found".dimmed());
        return Ok(());
    }

    for event in events {
        println!("  {}", render_event(event, &tz));
    }

    Ok(())
}
