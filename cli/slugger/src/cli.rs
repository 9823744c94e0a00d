//! Command-line surface.

use std::path::PathBuf;

use anyhow::Result;
use clap::{CommandFactory, Parser};

use crate::config::DeployConfig;
use crate::error::CliError;
use crate::output::Console;
use crate::source::{ProcessEnv, SystemRunner};

/// Default platform API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.heroku.com";

const LONG_ABOUT: &str = "\
Slugger deploys a pre-built slug file to Heroku. It will attempt to
automatically determine the correct Heroku app and authentication
information from the heroku command and current directory.

To create a slug from an app directory (./app prefix is required):

  tar czvf slug.tgz ./app

For more information on Heroku and how to create a slug, visit:
https://devcenter.heroku.com/articles/platform-api-deploying-slugs";

/// Deploy a pre-built slug to a Heroku app.
#[derive(Debug, Parser)]
#[command(name = "slugger")]
#[command(author, version, about, long_about = LONG_ABOUT)]
pub struct Cli {
    /// Heroku app name [env: HEROKU_APP].
    #[arg(long)]
    pub app: Option<String>,

    /// Heroku username [env: HEROKU_USER].
    #[arg(long)]
    pub user: Option<String>,

    /// Heroku password [env: HEROKU_PASSWORD].
    #[arg(long)]
    pub password: Option<String>,

    /// Heroku API token [env: HEROKU_TOKEN].
    #[arg(long)]
    pub token: Option<String>,

    /// Stack the slug targets (e.g. heroku-24).
    #[arg(long)]
    pub stack: Option<String>,

    /// Path to Procfile.
    #[arg(long, value_name = "PATH", default_value = "Procfile")]
    pub procfile: PathBuf,

    /// Path to slug file.
    #[arg(long, value_name = "PATH", default_value = "slug.tgz")]
    pub slug: PathBuf,

    /// Existing slug ID to release (skips the upload).
    #[arg(long, value_name = "SLUG_ID")]
    pub release: Option<String>,

    /// Commit label; defaults to `git describe` output.
    #[arg(long, value_name = "SHA")]
    pub commit: Option<String>,

    /// Language description recorded on the slug.
    #[arg(long)]
    pub language: Option<String>,

    /// Platform API base URL.
    #[arg(long, env = "HEROKU_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Timeout for platform API requests, in seconds.
    #[arg(
        long,
        value_name = "SECS",
        default_value_t = 60,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub api_timeout: u64,

    /// Do everything except uploading and releasing.
    #[arg(long)]
    pub dry_run: bool,

    /// Upload the slug but don't release it.
    #[arg(long)]
    pub upload_only: bool,

    /// Dump outgoing upload request headers and enable debug logs.
    #[arg(short, long)]
    pub verbose: bool,

    /// Show info for the slug given by --release instead of deploying.
    #[arg(long)]
    pub info: bool,

    /// With --info, print only the slug's commit.
    #[arg(long, requires = "info")]
    pub commit_only: bool,
}

impl Cli {
    /// Resolve configuration and run the deploy pipeline.
    pub async fn run(self, console: &mut Console) -> Result<()> {
        let runner = SystemRunner;
        let config = DeployConfig::resolve(&self, &ProcessEnv, &runner)?;

        let outcome = crate::deploy::run(&config, &runner, console).await?;
        console.report(&outcome).map_err(CliError::Output)?;

        Ok(())
    }
}

/// Print the long usage text to stderr.
pub fn print_usage() {
    eprintln!("{}", Cli::command().render_long_help());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["slugger"]).unwrap();
        assert_eq!(cli.procfile, PathBuf::from("Procfile"));
        assert_eq!(cli.slug, PathBuf::from("slug.tgz"));
        assert_eq!(cli.api_timeout, 60);
        assert!(!cli.dry_run && !cli.upload_only && !cli.info);
    }

    #[test]
    fn commit_only_requires_info() {
        assert!(Cli::try_parse_from(["slugger", "--commit-only"]).is_err());
        let args = ["slugger", "--info", "--commit-only", "--release", "abc"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(cli.commit_only);
    }

    #[test]
    fn api_timeout_must_be_positive() {
        let err = Cli::try_parse_from(["slugger", "--api-timeout", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let cli = Cli::try_parse_from(["slugger", "--api-timeout", "1"]).unwrap();
        assert_eq!(cli.api_timeout, 1);
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
