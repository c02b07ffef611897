use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::JobGateway;
use super::error::GatewayError;
use super::types::{
    ExtractRequest, ImageSummary, JobId, JobStatus, SubmitResponse, TaskStatusResponse,
};
use crate::cache::TtlCache;
use crate::config::ScanflowConfig;
use crate::job::{Payload, UnitOfWork};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_IMAGE_CACHE_TTL: Duration = Duration::from_secs(60);

/// REST realization of [`JobGateway`].
///
/// * upload: `POST {base}/upload` (multipart `file` + `folder`)
/// * re-analyze: `POST {base}/images/{name}/extract`
/// * status: `GET {base}/tasks/{id}`
/// * folder listing: `GET {base}/folders/{folder}/images`, cached
pub struct HttpGateway {
    base_url: String,
    api_token: Option<String>,
    client: Client,
    image_cache: TtlCache<String, Vec<ImageSummary>>,
    image_cache_ttl: Duration,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(base_url, client))
    }

    /// Use a preconfigured `reqwest` client (proxies, TLS, timeouts).
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: None,
            client,
            image_cache: TtlCache::new(),
            image_cache_ttl: DEFAULT_IMAGE_CACHE_TTL,
        }
    }

    pub fn from_config(config: &ScanflowConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout())
            .build()?;
        let mut gateway = Self::with_client(&config.base_url, client)
            .with_image_cache_ttl(config.image_cache_ttl());
        gateway.api_token = config.api_token.clone();
        Ok(gateway)
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_image_cache_ttl(mut self, ttl: Duration) -> Self {
        self.image_cache_ttl = ttl;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Lists the images stored in `folder`. Served from cache while fresh.
    pub async fn list_images(&self, folder: &str) -> Result<Vec<ImageSummary>, GatewayError> {
        self.image_cache
            .get_or_fetch(folder.to_string(), self.image_cache_ttl, || async {
                let url = format!(
                    "{}/folders/{}/images",
                    self.base_url,
                    urlencoding::encode(folder)
                );
                debug!(%url, "listing folder images");
                let response = self.authorized(self.client.get(&url)).send().await?;
                Self::handle_response(response).await
            })
            .await
    }

    /// Drops the cached listing for `folder`, e.g. after an upload into it.
    pub fn invalidate_folder(&self, folder: &str) {
        self.image_cache.invalidate(&folder.to_string());
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Checks the status and decodes the JSON body.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(GatewayError::api(status.as_u16(), message));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| GatewayError::Parse(e.to_string()))
    }
}

impl JobGateway for HttpGateway {
    async fn submit(&self, unit: &UnitOfWork) -> Result<JobId, GatewayError> {
        let request = match unit.payload() {
            Payload::Upload(file) => {
                let url = format!("{}/upload", self.base_url);
                let part = Part::bytes(file.bytes.clone())
                    .file_name(file.file_name.clone())
                    .mime_str(&file.content_type)?;
                let form = Form::new()
                    .part("file", part)
                    .text("folder", file.folder.clone());
                self.client.post(url).multipart(form)
            }
            Payload::Analyze(image) => {
                let url = format!(
                    "{}/images/{}/extract",
                    self.base_url,
                    urlencoding::encode(&image.image_name)
                );
                self.client.post(url).json(&ExtractRequest {
                    folder: image.folder.as_deref(),
                })
            }
        };

        let response = self.authorized(request).send().await?;
        let body: SubmitResponse = Self::handle_response(response).await?;
        if body.job_id.is_empty() {
            return Err(GatewayError::Parse("empty job id".into()));
        }

        if let Payload::Upload(file) = unit.payload() {
            self.invalidate_folder(&file.folder);
        }
        Ok(JobId::new(body.job_id))
    }

    async fn poll(&self, job_id: &JobId) -> Result<JobStatus, GatewayError> {
        let url = format!(
            "{}/tasks/{}",
            self.base_url,
            urlencoding::encode(job_id.as_str())
        );
        let response = self.authorized(self.client.get(&url)).send().await?;
        let body: TaskStatusResponse = Self::handle_response(response).await?;
        Ok(body.into())
    }
}
