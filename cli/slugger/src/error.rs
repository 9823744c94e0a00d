//! Error handling and display for the CLI.

use std::path::PathBuf;

use colored::Colorize;
use thiserror::Error;

use crate::procfile::ManifestError;
use crate::source::ProbeError;

/// Exit status for usage errors and other fatal failures.
pub const EXIT_FAILURE: i32 = 1;

/// Exit status when a required discovery command failed.
pub const EXIT_DISCOVERY: i32 = 2;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Unable to determine {what}: {source}")]
    Discovery {
        what: &'static str,
        #[source]
        source: ProbeError,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("failed to read slug {}: {source}", .path.display())]
    SlugFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not authenticated. Check your token or username/password.")]
    NotAuthenticated,

    #[error("{operation} failed: {message} (HTTP {status})")]
    Api {
        operation: &'static str,
        status: u16,
        id: String,
        message: String,
    },

    #[error("{operation} failed: {source}")]
    Network {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{operation} failed: {reason}")]
    InvalidResponse {
        operation: &'static str,
        reason: String,
    },

    #[error("upload slug failed: blob store returned HTTP {status}")]
    UploadRejected { status: u16 },

    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl CliError {
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    pub fn network(operation: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Network { operation, source }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// Process exit status for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Discovery { .. } => EXIT_DISCOVERY,
            _ => EXIT_FAILURE,
        }
    }
}

/// Exit status for any top-level error.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<CliError>()
        .map(CliError::exit_code)
        .unwrap_or(EXIT_FAILURE)
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        if let Some(hint) = hint(cli_err) {
            eprintln!("\n{}", format!("Hint: {hint}").yellow());
        }
    }
}

fn hint(err: &CliError) -> Option<&'static str> {
    match err {
        CliError::NotAuthenticated => {
            Some("Run `heroku login`, or pass --token / set HEROKU_TOKEN.")
        }
        CliError::Api { status: 403, .. } => {
            Some("You may not have permission to deploy to this app.")
        }
        CliError::Api { status: 404, .. } => {
            Some("Check the app name (--app or HEROKU_APP) and the slug ID.")
        }
        CliError::Network { .. } => Some("Check your network connection and --api-url."),
        CliError::Discovery { .. } => {
            Some("Install the heroku CLI, or pass --app and --token explicitly.")
        }
        CliError::UploadRejected { .. } => Some(
            "The slug may already be uploaded. Re-run with --release <slug id> to release it.",
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_errors_exit_with_two() {
        let err = CliError::Discovery {
            what: "app name",
            source: ProbeError::Failed {
                command: "heroku info --shell".to_string(),
                status: "exit status: 1".to_string(),
                stderr: String::new(),
            },
        };
        assert_eq!(err.exit_code(), EXIT_DISCOVERY);
        assert_eq!(exit_code(&anyhow::Error::new(err)), EXIT_DISCOVERY);
    }

    #[test]
    fn other_errors_exit_with_one() {
        assert_eq!(CliError::usage("no app").exit_code(), EXIT_FAILURE);
        assert_eq!(
            CliError::UploadRejected { status: 409 }.exit_code(),
            EXIT_FAILURE
        );
        assert_eq!(exit_code(&anyhow::anyhow!("boom")), EXIT_FAILURE);
    }

    #[test]
    fn api_error_names_operation() {
        let err = CliError::Api {
            operation: "create release",
            status: 422,
            id: "invalid_params".to_string(),
            message: "Slug not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "create release failed: Slug not found (HTTP 422)"
        );
    }
}
