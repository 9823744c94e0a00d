//! HTTP client for the platform API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use crate::config::{Credentials, DeployConfig};
use crate::error::CliError;
use crate::procfile::ProcessManifest;

/// Media type selecting version 3 of the platform API.
const API_ACCEPT: &str = "application/vnd.heroku+json; version=3";

/// Connect timeout for both the API and the blob store.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// API client for slug and release endpoints.
#[derive(Debug, Clone)]
pub struct PlatformClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl PlatformClient {
    /// Create a new API client from the resolved deploy configuration.
    pub fn new(config: &DeployConfig) -> Result<Self, CliError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(API_ACCEPT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.api_timeout)
            .build()
            .map_err(CliError::network("create API client"))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            credentials: config.credentials.clone(),
        })
    }

    /// Build a URL for an endpoint.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match (&self.credentials.token, &self.credentials.username) {
            (Some(token), _) => request.bearer_auth(token),
            (None, username) => request.basic_auth(
                username.as_deref().unwrap_or_default(),
                self.credentials.password.as_deref(),
            ),
        }
    }

    /// Register a slug and obtain its one-shot upload target.
    pub async fn create_slug(&self, app: &str, request: &CreateSlug<'_>) -> Result<Slug, CliError> {
        self.post("create slug", &format!("/apps/{}/slugs", app), request)
            .await
    }

    /// Release a slug as the app's running code.
    pub async fn create_release(&self, app: &str, slug_id: &str) -> Result<Release, CliError> {
        let body = CreateRelease { slug: slug_id };
        self.post("create release", &format!("/apps/{}/releases", app), &body)
            .await
    }

    /// Fetch the full slug descriptor.
    pub async fn slug_info(&self, app: &str, slug_id: &str) -> Result<serde_json::Value, CliError> {
        self.get("slug info", &format!("/apps/{}/slugs/{}", app, slug_id))
            .await
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
    ) -> Result<T, CliError> {
        debug!(operation, path, "GET");
        let response = self
            .authorize(self.client.get(self.url(path)))
            .send()
            .await
            .map_err(CliError::network(operation))?;

        self.handle_response(operation, response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        operation: &'static str,
        path: &str,
        body: &B,
    ) -> Result<T, CliError> {
        debug!(operation, path, "POST");
        let response = self
            .authorize(self.client.post(self.url(path)).json(body))
            .send()
            .await
            .map_err(CliError::network(operation))?;

        self.handle_response(operation, response).await
    }

    /// Handle a successful or error response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, CliError> {
        let status = response.status();
        debug!(operation, status = status.as_u16(), "response");

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CliError::InvalidResponse {
                    operation,
                    reason: format!("failed to parse response: {e}"),
                })
        } else {
            self.handle_error(operation, response).await
        }
    }

    /// Handle an error response.
    async fn handle_error<T>(
        &self,
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, CliError> {
        let status = response.status().as_u16();

        if status == 401 {
            return Err(CliError::NotAuthenticated);
        }

        let error_body: ApiErrorResponse =
            response.json().await.unwrap_or_else(|_| ApiErrorResponse {
                id: "unknown".to_string(),
                message: "Unknown error".to_string(),
            });

        Err(CliError::Api {
            operation,
            status,
            id: error_body.id,
            message: error_body.message,
        })
    }
}

/// Body of the create-slug call.
#[derive(Debug, Serialize)]
pub struct CreateSlug<'a> {
    pub process_types: &'a ProcessManifest,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack_provided_description: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    slug: &'a str,
}

/// Slug descriptor returned by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Slug {
    pub id: String,
    pub blob: Blob,
}

/// One-shot upload target for slug bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct Blob {
    pub method: String,
    pub url: String,
}

/// Release record created by the platform.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: String,
    pub version: u64,
    #[serde(default)]
    pub status: Option<String>,
}

/// API error response structure.
#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    id: String,
    message: String,
}
