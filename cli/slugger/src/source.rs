//! Value providers for configuration discovery.
//!
//! A setting can come from an explicit flag, an environment variable, or the
//! output of a local command (`heroku info`, `heroku auth:token`, `git describe`).
//! Sources are tried in a fixed order and the first non-empty value wins.

use std::process::Command;

use thiserror::Error;
use tracing::debug;

/// Failure of a subprocess probe.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("`{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}': exited with {status}{}", stderr_suffix(.stderr))]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

/// Read access to process environment variables.
pub trait Environment {
    fn var(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Runs a local command and returns its stdout.
pub trait CommandRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError>;
}

/// Runs commands with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<String, ProbeError> {
        let command = display_command(program, args);
        debug!(%command, "running probe");

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|source| ProbeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

pub fn display_command(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// A provider of a single configuration value.
pub trait Source {
    /// Short description used in debug logs.
    fn describe(&self) -> String;

    /// Look the value up. `Ok(None)` means "not provided here".
    fn lookup(&self) -> Result<Option<String>, ProbeError>;
}

/// A value passed explicitly, usually a command-line flag.
pub struct Explicit<'a>(pub Option<&'a str>);

impl Source for Explicit<'_> {
    fn describe(&self) -> String {
        "flag".to_string()
    }

    fn lookup(&self) -> Result<Option<String>, ProbeError> {
        Ok(non_empty(self.0))
    }
}

/// A value read from an environment variable.
pub struct EnvVar<'a> {
    pub key: &'static str,
    pub env: &'a dyn Environment,
}

impl Source for EnvVar<'_> {
    fn describe(&self) -> String {
        format!("${}", self.key)
    }

    fn lookup(&self) -> Result<Option<String>, ProbeError> {
        Ok(non_empty(self.env.var(self.key).as_deref()))
    }
}

/// A value extracted from the stdout of a local command.
pub struct CommandProbe<'a> {
    pub program: &'static str,
    pub args: &'static [&'static str],
    pub runner: &'a dyn CommandRunner,
    pub extract: fn(&str) -> Option<String>,
}

impl Source for CommandProbe<'_> {
    fn describe(&self) -> String {
        display_command(self.program, self.args)
    }

    fn lookup(&self) -> Result<Option<String>, ProbeError> {
        let stdout = self.runner.run(self.program, self.args)?;
        Ok((self.extract)(&stdout).and_then(|value| non_empty(Some(&value))))
    }
}

/// Extractor that uses the whole trimmed output.
pub fn trimmed(stdout: &str) -> Option<String> {
    Some(stdout.trim().to_string())
}

/// Outcome of trying a chain of sources.
#[derive(Debug, Default)]
pub struct Resolved {
    pub value: Option<String>,
    /// The last probe failure seen, kept only when no source produced a value.
    pub failure: Option<ProbeError>,
}

/// Try each source in order and return the first non-empty value.
pub fn first_of(sources: &[&dyn Source]) -> Resolved {
    let mut failure = None;

    for source in sources {
        match source.lookup() {
            Ok(Some(value)) => {
                debug!(source = %source.describe(), "resolved value");
                return Resolved {
                    value: Some(value),
                    failure: None,
                };
            }
            Ok(None) => {}
            Err(err) => {
                debug!(source = %source.describe(), error = %err, "source failed");
                failure = Some(err);
            }
        }
    }

    Resolved {
        value: None,
        failure,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
