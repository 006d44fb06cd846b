use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

/// Turns an assembled prompt into a narrative summary.
pub trait Summarizer: Send + Sync {
    fn summarize(&self, prompt: &str) -> Result<String>;
}

/// Runs a shell command with the prompt on stdin and takes its stdout.
#[derive(Debug, Clone)]
pub struct CommandSummarizer {
    command: String,
    cwd: Option<PathBuf>,
}

impl CommandSummarizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            cwd: None,
        }
    }

    pub fn in_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

#[cfg(not(windows))]
fn shell_cmd(cmd: &str) -> Command {
    let mut c = Command::new("sh");
    c.args(["-c", cmd]);
    c
}

#[cfg(windows)]
fn shell_cmd(cmd: &str) -> Command {
    let mut c = Command::new("cmd");
    c.args(["/C", cmd]);
    c
}

impl Summarizer for CommandSummarizer {
    fn summarize(&self, prompt: &str) -> Result<String> {
        let mut cmd = shell_cmd(&self.command);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("spawn summarizer `{}`", self.command))?;

        // Feed stdin from a thread so a chatty command cannot deadlock on a full pipe.
        let mut stdin = child.stdin.take().context("summarizer stdin unavailable")?;
        let input = prompt.to_owned();
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child
            .wait_with_output()
            .with_context(|| format!("wait for summarizer `{}`", self.command))?;
        match writer.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                tracing::debug!("summarizer closed stdin early");
            }
            Ok(Err(e)) => return Err(e).context("write prompt to summarizer"),
            Err(_) => bail!("prompt writer thread panicked"),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "summarizer exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            );
        }
        let text = String::from_utf8(output.stdout).context("summarizer output is not UTF-8")?;
        if text.trim().is_empty() {
            bail!("summarizer returned no output");
        }
        Ok(text)
    }
}
