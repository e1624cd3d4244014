//! Generator backed by an external executable.
//!
//! The binary receives the `GenerationRequest` as one line of JSON on stdin
//! and writes its reply text to stdout. Anything on stderr is passed through.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::context::GenerationRequest;
use crate::error::{CalPromptError, CalPromptResult};
use crate::generator::Generator;

#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: String,
    args: Vec<String>,
}

impl CommandGenerator {
    pub fn new(program: impl Into<String>) -> Self {
        CommandGenerator {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn binary_path(&self) -> CalPromptResult<PathBuf> {
        which::which(&self.program)
            .map_err(|_| CalPromptError::GeneratorNotInstalled(self.program.clone()))
    }
}

#[async_trait]
impl Generator for CommandGenerator {
    async fn generate(&self, request: &GenerationRequest) -> CalPromptResult<String> {
        let request_json = serde_json::to_string(request)?;
        let binary_path = self.binary_path()?;

        debug!(binary = %binary_path.display(), "Spawning generator");

        let mut child = Command::new(&binary_path)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CalPromptError::Generator(format!(
                    "Failed to spawn {}: {e}",
                    binary_path.display()
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CalPromptError::Generator("Generator stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(CalPromptError::Generator(format!(
                "Generator exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).into_owned();
        if reply.trim().is_empty() {
            return Err(CalPromptError::Generator("Generator returned no output".into()));
        }

        Ok(reply)
    }
}
