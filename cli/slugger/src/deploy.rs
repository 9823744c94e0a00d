//! Deploy pipeline.
//!
//! ```text
//! resolve-config
//!   → (target id? skip upload : upload)
//!   → (info? inspect : maybe-release)
//!   → report
//! ```
//!
//! Every stage returns a `Result`; the first failure aborts the run.

use tracing::debug;

use crate::client::PlatformClient;
use crate::config::DeployConfig;
use crate::error::CliError;
use crate::output::Console;
use crate::source::CommandRunner;

/// Result of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A slug was uploaded and/or targeted; `version` is set when released.
    Deployed {
        slug_id: String,
        version: Option<u64>,
    },
    /// Slug info was printed; nothing else happened.
    Inspected,
}

/// Run the pipeline for an already resolved configuration.
pub async fn run(
    config: &DeployConfig,
    runner: &dyn CommandRunner,
    console: &mut Console,
) -> Result<Outcome, CliError> {
    let api = PlatformClient::new(config)?;

    let slug_id = match config.release.as_deref() {
        Some(slug_id) => {
            debug!(slug_id, "using existing slug");
            slug_id.to_string()
        }
        None => crate::slug::upload(config, &api, runner, console).await?,
    };

    if config.mode.info {
        crate::release::show_info(config, &api, &slug_id, console).await?;
        return Ok(Outcome::Inspected);
    }

    let version = crate::release::maybe_release(config, &api, &slug_id, console).await?;

    Ok(Outcome::Deployed { slug_id, version })
}
