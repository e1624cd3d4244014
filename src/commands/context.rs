use anyhow::Result;
use calprompt_core::config::CalPromptConfig;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

pub async fn run(config: &CalPromptConfig, text: &str, now: DateTime<Utc>) -> Result<()> {
    let session = super::open_session(config).await?;
    let intent = session.normalize(text, now);
    let request = session.context(text, &intent, now)?;

    println!("{}", "System".bold());
    println!("{}", request.system);
    println!("{}", "User".bold());
    println!("{}", request.user);

    Ok(())
}
