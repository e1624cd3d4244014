use anyhow::Result;
use calprompt_core::config::CalPromptConfig;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;

use crate::render::{render_preview, render_report};
use crate::utils::tui::create_spinner;

pub async fn run(config: &CalPromptConfig, text: &str, now: DateTime<Utc>, dry_run: bool) -> Result<()> {
    let generator = config.generator()?;
    let mut session = super::open_session(config).await?;
    let tz = session.settings().tz;

    let spinner = create_spinner("Asking generator...".dimmed().to_string());

    let lines = if dry_run {
        let preview = session.dry_run(generator.as_ref(), text, now).await;
        spinner.finish_and_clear();
        render_preview(&preview?, &tz)
    } else {
        let report = session.reconcile(generator.as_ref(), text, now).await;
        spinner.finish_and_clear();
        render_report(&report?, &tz)
    };

    for line in lines {
        println!("{}", line);
    }

    Ok(())
}
