//! Slug registration and upload.

use std::path::Path;

use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use tracing::debug;

use crate::client::{CreateSlug, PlatformClient, CONNECT_TIMEOUT};
use crate::config::DeployConfig;
use crate::error::CliError;
use crate::output::{format_bytes, Console};
use crate::procfile::ProcessManifest;
use crate::source::{first_of, trimmed, CommandProbe, CommandRunner, Explicit};

const OPERATION: &str = "upload slug";

/// Statuses the blob store returns for an accepted upload.
pub fn upload_succeeded(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED)
}

/// Commit label: `--commit`, else best-effort `git describe`.
pub fn commit_label(config: &DeployConfig, runner: &dyn CommandRunner) -> Option<String> {
    let resolved = first_of(&[
        &Explicit(config.commit.as_deref()),
        &CommandProbe {
            program: "git",
            args: &["describe", "--always", "--abbrev", "--dirty"],
            runner,
            extract: trimmed,
        },
    ]);
    if let Some(err) = resolved.failure {
        debug!(error = %err, "no commit label");
    }
    resolved.value
}

/// Register the slug with the platform and stream its bytes to the blob store.
///
/// Returns the new slug's ID. With `dry_run` the upload request is built (and
/// dumped when verbose) but never sent.
pub async fn upload(
    config: &DeployConfig,
    api: &PlatformClient,
    runner: &dyn CommandRunner,
    console: &mut Console,
) -> Result<String, CliError> {
    let manifest = ProcessManifest::read(&config.procfile)?;
    let file = open_slug(&config.slug_file).await?;
    let size = file
        .metadata()
        .await
        .map_err(|source| CliError::SlugFile {
            path: config.slug_file.clone(),
            source,
        })?
        .len();

    let commit = commit_label(config, runner);

    console.field("App", &config.app);
    console.field("Commit", commit.as_deref().unwrap_or_default());
    console.field("Processes", manifest.render());
    console.field("Slug file", config.slug_file.display());

    let slug = api
        .create_slug(
            &config.app,
            &CreateSlug {
                process_types: &manifest,
                commit: commit.as_deref(),
                stack: config.stack.as_deref(),
                buildpack_provided_description: config.language.as_deref(),
            },
        )
        .await?;
    console.field("Created slug", &slug.id);

    let client = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
        .map_err(CliError::network(OPERATION))?;
    let request = build_upload_request(&client, &slug.blob.method, &slug.blob.url, file, size)?;

    if config.mode.verbose {
        console.diagnostic(&dump_request(&request));
    }

    if config.mode.dry_run {
        console.info(&format!(
            "Dry run: not uploading {} to the blob store",
            format_bytes(size)
        ));
        return Ok(slug.id);
    }

    console.field("Uploading slug", format_bytes(size));
    let response = client
        .execute(request)
        .await
        .map_err(CliError::network(OPERATION))?;

    let status = response.status();
    debug!(status = status.as_u16(), "blob store response");
    if !upload_succeeded(status) {
        return Err(CliError::UploadRejected {
            status: status.as_u16(),
        });
    }

    Ok(slug.id)
}

async fn open_slug(path: &Path) -> Result<tokio::fs::File, CliError> {
    tokio::fs::File::open(path)
        .await
        .map_err(|source| CliError::SlugFile {
            path: path.to_path_buf(),
            source,
        })
}

/// Build the raw upload request: streamed body, explicit length, no content type.
pub fn build_upload_request(
    client: &reqwest::Client,
    method: &str,
    url: &str,
    file: tokio::fs::File,
    size: u64,
) -> Result<reqwest::Request, CliError> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
        CliError::InvalidResponse {
            operation: "create slug",
            reason: format!("unsupported blob method '{method}'"),
        }
    })?;

    let mut request = client
        .request(method, url)
        .header(CONTENT_LENGTH, HeaderValue::from(size))
        .body(reqwest::Body::from(file))
        .build()
        .map_err(CliError::network(OPERATION))?;

    // Signed blob URLs expect a bare octet stream.
    request.headers_mut().remove(CONTENT_TYPE);

    Ok(request)
}

/// Request line and headers, never the body.
pub fn dump_request(request: &reqwest::Request) -> String {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => out.push_str(&format!("Host: {host}:{port}\r\n")),
            None => out.push_str(&format!("Host: {host}\r\n")),
        }
    }
    for (name, value) in request.headers() {
        out.push_str(&format!(
            "{}: {}\r\n",
            name.as_str(),
            value.to_str().unwrap_or("<binary>")
        ));
    }
    out.push_str("\r\n");
    out
}
