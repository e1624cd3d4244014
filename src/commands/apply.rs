use anyhow::{Context, Result};
use calprompt_core::config::CalPromptConfig;
use calprompt_core::intent::NormalizedIntent;
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use crate::render::render_report;

/// Apply a reply produced elsewhere, e.g. saved from `calprompt context`.
pub async fn run(
    config: &CalPromptConfig,
    file: &str,
    request: Option<&str>,
    now: DateTime<Utc>,
) -> Result<()> {
    let raw = read_reply(file).await?;
    let mut session = super::open_session(config).await?;
    let tz = session.settings().tz;

    let intent = match request {
        Some(text) => session.normalize(text, now),
        None => NormalizedIntent::default(),
    };

    let report = session.apply_reply(&intent, &raw).await?;

    for line in render_report(&report, &tz) {
        println!("{}", line);
    }

    Ok(())
}

async fn read_reply(file: &str) -> Result<String> {
    if file == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Could not read reply from stdin")?;
        return Ok(raw);
    }

    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Could not read reply from {file}"))
}
