//! Release and slug-info stage.

use crate::client::PlatformClient;
use crate::config::DeployConfig;
use crate::error::CliError;
use crate::output::Console;

/// Print the slug descriptor, or only its commit with `--commit-only`.
pub async fn show_info(
    config: &DeployConfig,
    api: &PlatformClient,
    slug_id: &str,
    console: &mut Console,
) -> Result<(), CliError> {
    let info = api.slug_info(&config.app, slug_id).await?;

    if config.mode.commit_only {
        let commit = info
            .get("commit")
            .and_then(|commit| commit.as_str())
            .unwrap_or_default();
        console.print(commit).map_err(CliError::Output)?;
    } else {
        console.print_json(&info).map_err(CliError::Output)?;
    }

    Ok(())
}

/// Release the slug unless `--dry-run` or `--upload-only` says otherwise.
///
/// Returns the new release version, if a release was made.
pub async fn maybe_release(
    config: &DeployConfig,
    api: &PlatformClient,
    slug_id: &str,
    console: &mut Console,
) -> Result<Option<u64>, CliError> {
    if config.mode.dry_run {
        console.info("Dry run: not releasing");
        return Ok(None);
    }
    if config.mode.upload_only {
        console.info("Upload only: not releasing");
        return Ok(None);
    }

    let release = api.create_release(&config.app, slug_id).await?;
    console.field("Deployed version", release.version);
    tracing::debug!(
        release_id = %release.id,
        status = release.status.as_deref().unwrap_or("unknown"),
        "release created"
    );

    Ok(Some(release.version))
}
