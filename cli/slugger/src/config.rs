//! Deploy configuration.
//!
//! Handles:
//! - App name discovery (flag, `HEROKU_APP`, `heroku info --shell`)
//! - Credentials (flags, environment, `heroku auth:token`)
//! - Paths, metadata and behavior flags
//!
//! The resolved [`DeployConfig`] is immutable and passed to each stage.

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use crate::cli::Cli;
use crate::error::CliError;
use crate::source::{first_of, trimmed, CommandProbe, CommandRunner, EnvVar, Environment, Explicit};

pub const ENV_APP: &str = "HEROKU_APP";
pub const ENV_USER: &str = "HEROKU_USER";
pub const ENV_PASSWORD: &str = "HEROKU_PASSWORD";
pub const ENV_TOKEN: &str = "HEROKU_TOKEN";

/// Credentials for the platform API.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Bearer token; preferred over username/password when present.
    pub token: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Credentials {
    fn has_basic(&self) -> bool {
        self.username.is_some() || self.password.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.token.is_none() && !self.has_basic()
    }
}

/// Behavior flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mode {
    pub dry_run: bool,
    pub upload_only: bool,
    pub info: bool,
    pub commit_only: bool,
    pub verbose: bool,
}

/// Fully resolved deployment inputs.
#[derive(Debug, Clone)]
pub struct DeployConfig {
    pub app: String,
    pub credentials: Credentials,
    pub stack: Option<String>,
    pub procfile: PathBuf,
    pub slug_file: PathBuf,
    /// Pre-existing slug to target instead of uploading.
    pub release: Option<String>,
    pub commit: Option<String>,
    pub language: Option<String>,
    pub api_url: String,
    pub api_timeout: Duration,
    pub mode: Mode,
}

impl DeployConfig {
    /// Build the configuration from parsed flags, the environment and local
    /// commands.
    pub fn resolve(
        cli: &Cli,
        env: &dyn Environment,
        runner: &dyn CommandRunner,
    ) -> Result<Self, CliError> {
        let release = non_empty(cli.release.as_deref());
        if cli.info && release.is_none() {
            return Err(CliError::usage("--info requires --release <slug id>"));
        }

        let app = resolve_app(cli, env, runner)?;
        let credentials = resolve_credentials(cli, env, runner)?;

        Ok(Self {
            app,
            credentials,
            stack: non_empty(cli.stack.as_deref()),
            procfile: cli.procfile.clone(),
            slug_file: cli.slug.clone(),
            release,
            commit: non_empty(cli.commit.as_deref()),
            language: non_empty(cli.language.as_deref()),
            api_url: cli.api_url.clone(),
            api_timeout: Duration::from_secs(cli.api_timeout),
            mode: Mode {
                dry_run: cli.dry_run,
                upload_only: cli.upload_only,
                info: cli.info,
                commit_only: cli.commit_only,
                verbose: cli.verbose,
            },
        })
    }
}

fn resolve_app(
    cli: &Cli,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
) -> Result<String, CliError> {
    let resolved = first_of(&[
        &Explicit(cli.app.as_deref()),
        &EnvVar { key: ENV_APP, env },
        &CommandProbe {
            program: "heroku",
            args: &["info", "--shell"],
            runner,
            extract: app_name_from_info,
        },
    ]);

    match (resolved.value, resolved.failure) {
        (Some(app), _) => Ok(app),
        (None, Some(source)) => Err(CliError::Discovery {
            what: "app name",
            source,
        }),
        (None, None) => Err(CliError::usage(
            "Unable to determine app name. Use --app or set HEROKU_APP.",
        )),
    }
}

fn resolve_credentials(
    cli: &Cli,
    env: &dyn Environment,
    runner: &dyn CommandRunner,
) -> Result<Credentials, CliError> {
    let username = first_of(&[
        &Explicit(cli.user.as_deref()),
        &EnvVar { key: ENV_USER, env },
    ])
    .value;
    let password = first_of(&[
        &Explicit(cli.password.as_deref()),
        &EnvVar {
            key: ENV_PASSWORD,
            env,
        },
    ])
    .value;
    let token = first_of(&[
        &Explicit(cli.token.as_deref()),
        &EnvVar { key: ENV_TOKEN, env },
        &CommandProbe {
            program: "heroku",
            args: &["auth:token"],
            runner,
            extract: trimmed,
        },
    ]);

    let credentials = Credentials {
        username,
        password,
        token: token.value,
    };

    if credentials.token.is_none() && !credentials.has_basic() {
        if let Some(source) = token.failure {
            return Err(CliError::Discovery {
                what: "credentials",
                source,
            });
        }
    }

    if credentials.is_empty() {
        return Err(CliError::usage("Unable to determine credentials."));
    }

    Ok(credentials)
}

/// Extract `name=<value>` from `heroku info --shell` output.
pub fn app_name_from_info(stdout: &str) -> Option<String> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let re = NAME.get_or_init(|| Regex::new(r"\bname=([^\n]+)").expect("valid regex"));
    re.captures(stdout)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches('\r').to_string())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}
