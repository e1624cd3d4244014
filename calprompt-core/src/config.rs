//! User configuration at ~/.config/calprompt/config.toml
//!
//! Every field has a default, so a missing or fully commented-out file is
//! valid. `CALPROMPT_*` environment variables override the file, with `__`
//! separating nested keys (`CALPROMPT_GENERATOR__MODEL=gpt-4o`).

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono_tz::Tz;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{CalPromptError, CalPromptResult};
use crate::generator::{ChatGenerator, CommandGenerator, Generator};
use crate::session::SessionSettings;
use crate::timezone::{DEFAULT_CIVIL_ZONE, TimeZoneNormalizer};
use crate::validate::ScheduleRules;

static DEFAULT_STORE_PATH: &str = "~/.local/share/calprompt/events.json";
static DEFAULT_TIMEOUT: &str = "30s";
static DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    OpenAi,
    Command,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub kind: GeneratorKind,
    pub model: String,
    pub api_url: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    pub timeout: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            kind: GeneratorKind::default(),
            model: crate::generator::DEFAULT_MODEL.to_string(),
            api_url: crate::generator::DEFAULT_API_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            command: None,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalPromptConfig {
    pub civil_zone: String,
    pub store_path: PathBuf,
    pub generator: GeneratorConfig,
    pub rules: ScheduleRules,
}

impl Default for CalPromptConfig {
    fn default() -> Self {
        CalPromptConfig {
            civil_zone: DEFAULT_CIVIL_ZONE.name().to_string(),
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            generator: GeneratorConfig::default(),
            rules: ScheduleRules::default(),
        }
    }
}

impl CalPromptConfig {
    pub fn config_path() -> CalPromptResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalPromptError::Config("Could not determine config directory".into()))?
            .join("calprompt");

        Ok(config_dir.join("config.toml"))
    }

    /// Load from the default location, writing a commented template there
    /// on first run.
    pub fn load() -> CalPromptResult<Self> {
        let path = Self::config_path()?;

        if !path.exists() {
            Self::create_default_config(&path)?;
        }

        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> CalPromptResult<Self> {
        Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(
                Environment::with_prefix("CALPROMPT")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| CalPromptError::Config(e.to_string()))
    }

    /// Create a default config file with all options commented out.
    pub fn create_default_config(path: &Path) -> CalPromptResult<()> {
        let contents = format!(
            "\
# calprompt configuration

# Time zone that words like \"morning\" and \"tomorrow\" refer to:
# civil_zone = \"{zone}\"

# Where events are stored:
# store_path = \"{store}\"

# [generator]
# kind = \"openai\"            # or \"command\"
# model = \"{model}\"
# api_key_env = \"{key_env}\"
# command = \"my-generator\"   # used when kind = \"command\"
# timeout = \"{timeout}\"

# [rules]
# business_days = [\"Mon\", \"Tue\", \"Wed\", \"Thu\", \"Fri\"]
# business_hours = {{ from = \"09:00:00\", until = \"17:00:00\" }}
# quiet_hours = {{ from = \"22:00:00\", until = \"07:00:00\" }}
",
            zone = DEFAULT_CIVIL_ZONE.name(),
            store = DEFAULT_STORE_PATH,
            model = crate::generator::DEFAULT_MODEL,
            key_env = DEFAULT_API_KEY_ENV,
            timeout = DEFAULT_TIMEOUT,
        );

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CalPromptError::Config(format!("Could not create config directory: {e}"))
            })?;
        }

        std::fs::write(path, contents)
            .map_err(|e| CalPromptError::Config(format!("Could not write config file: {e}")))?;

        Ok(())
    }

    pub fn civil_zone(&self) -> CalPromptResult<Tz> {
        self.civil_zone.parse::<Tz>().map_err(|_| {
            CalPromptError::Config(format!("Unknown time zone '{}'", self.civil_zone))
        })
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.store_path.to_string_lossy()).into_owned())
    }

    pub fn timeout(&self) -> CalPromptResult<Duration> {
        humantime::parse_duration(&self.generator.timeout).map_err(|e| {
            CalPromptError::Config(format!(
                "Invalid generator timeout '{}': {e}",
                self.generator.timeout
            ))
        })
    }

    pub fn session_settings(&self) -> CalPromptResult<SessionSettings> {
        Ok(SessionSettings {
            tz: TimeZoneNormalizer::new(self.civil_zone()?),
            rules: self.rules.clone(),
            generator_timeout: self.timeout()?,
        })
    }

    /// Build the configured generator. The API key is read from the
    /// environment here, never from the file.
    pub fn generator(&self) -> CalPromptResult<Box<dyn Generator>> {
        let cfg = &self.generator;

        match cfg.kind {
            GeneratorKind::OpenAi => {
                let api_key = std::env::var(&cfg.api_key_env).map_err(|_| {
                    CalPromptError::Config(format!(
                        "Set {} to use the openai generator",
                        cfg.api_key_env
                    ))
                })?;
                Ok(Box::new(
                    ChatGenerator::new(api_key)
                        .with_model(&cfg.model)
                        .with_api_url(&cfg.api_url),
                ))
            }
            GeneratorKind::Command => {
                let program = cfg.command.as_deref().ok_or_else(|| {
                    CalPromptError::Config("generator.command is required when kind = \"command\"".into())
                })?;
                Ok(Box::new(
                    CommandGenerator::new(program).with_args(cfg.args.iter().cloned()),
                ))
            }
        }
    }

    pub fn to_toml(&self) -> CalPromptResult<String> {
        toml::to_string_pretty(self).map_err(|e| CalPromptError::Config(e.to_string()))
    }
}
