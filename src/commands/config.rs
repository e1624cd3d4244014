use std::path::Path;

use anyhow::Result;
use calprompt_core::config::CalPromptConfig;
use owo_colors::OwoColorize;

pub fn run(config_path: &Path, config: &CalPromptConfig) -> Result<()> {
    println!("{}", "Paths".bold());
    print!("{}", render_paths(config_path, config));
    println!();
    println!("{}", "Effective settings".bold());
    print!("{}", config.to_toml()?);

    Ok(())
}

fn render_paths(config_path: &Path, config: &CalPromptConfig) -> String {
    format!(
        "  Config:  {}\n  Events:  {}\n",
        config_path.display(),
        config.store_path().display()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_show_the_loaded_file() {
        let config = CalPromptConfig {
            store_path: "/srv/calprompt/events.json".into(),
            ..Default::default()
        };
        let rendered = render_paths(Path::new("/etc/calprompt.toml"), &config);

        assert!(rendered.contains("Config:  /etc/calprompt.toml"));
        assert!(rendered.contains("Events:  /srv/calprompt/events.json"));
    }
}
