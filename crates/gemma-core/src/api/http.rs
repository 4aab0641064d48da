//! reqwest-backed implementation of every backend contract

use super::sanitize::{extract_error_detail, sanitize_error_text};
use super::types::{ChatReply, ChatRequest, CountResponse, QuickAnalysis};
use super::{AnalysisApi, ArchiveApi, TranscriptApi};
use crate::archive::{Artifact, ArtifactPage};
use crate::config::ApiConfig;
use crate::error::{GemmaError, GemmaResult};
use crate::filter::FilterSpec;
use crate::stream::{EventSource, EventStream, RunRequest, decode_event_stream};
use crate::transcript::{BrowsePage, ResultItem};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// HTTP client for the console backend
#[derive(Debug, Clone)]
pub struct HttpApi {
    config: ApiConfig,
    /// Request/response calls, bounded by the configured timeout
    client: Client,
    /// Event streams; only the connect phase is bounded
    stream_client: Client,
}

impl HttpApi {
    pub fn new(config: ApiConfig) -> GemmaResult<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| GemmaError::config(format!("Failed to build HTTP client: {}", e)))?;
        let stream_client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| GemmaError::config(format!("Failed to build stream client: {}", e)))?;

        Ok(Self {
            config,
            client,
            stream_client,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Endpoint URL with `segments` appended as percent-encoded path segments
    fn url_with_segments(&self, path: &str, segments: &[&str]) -> GemmaResult<String> {
        let raw = self.config.url(path);
        let mut url = Url::parse(&raw).map_err(|e| {
            GemmaError::config_with_context(e.to_string(), format!("Parsing {}", raw))
        })?;
        url.path_segments_mut()
            .map_err(|_| GemmaError::config(format!("'{}' cannot carry path segments", raw)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> GemmaResult<T> {
        self.get_url(self.config.url(path), query).await
    }

    async fn get_url<T: DeserializeOwned>(
        &self,
        url: String,
        query: &[(String, String)],
    ) -> GemmaResult<T> {
        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| GemmaError::transport_with_url(e.to_string(), &url))?;
        let response = check_status(response, &url).await?;
        decode_json(response, &url).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> GemmaResult<T> {
        self.post_url(self.config.url(path), body).await
    }

    async fn post_url<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: String,
        body: &B,
    ) -> GemmaResult<T> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GemmaError::transport_with_url(e.to_string(), &url))?;
        let response = check_status(response, &url).await?;
        decode_json(response, &url).await
    }
}

/// Turn a non-success response into an error carrying the server's own message
async fn check_status(response: Response, url: &str) -> GemmaResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(
        url,
        status = status.as_u16(),
        body = %sanitize_error_text(&body),
        "Request failed"
    );
    let message = extract_error_detail(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    });
    Err(GemmaError::http_with_url(status.as_u16(), message, url))
}

async fn decode_json<T: DeserializeOwned>(response: Response, url: &str) -> GemmaResult<T> {
    let text = response
        .text()
        .await
        .map_err(|e| GemmaError::transport_with_url(e.to_string(), url))?;
    serde_json::from_str(&text).map_err(|e| GemmaError::malformed_response(e.to_string(), url))
}

#[async_trait]
impl TranscriptApi for HttpApi {
    #[instrument(skip(self, filters), level = "debug")]
    async fn count(&self, filters: &FilterSpec) -> GemmaResult<u64> {
        let response: CountResponse = self
            .get_json(&self.config.endpoints.transcript_count, &filters.filter_pairs())
            .await?;
        Ok(response.count)
    }

    #[instrument(skip(self, filters), level = "debug")]
    async fn query(&self, filters: &FilterSpec, offset: u32) -> GemmaResult<BrowsePage> {
        self.get_json(
            &self.config.endpoints.transcript_query,
            &filters.page_pairs(offset),
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn recent(&self, limit: u32) -> GemmaResult<Vec<ResultItem>> {
        // Older deployments wrap the list in {"items": [...]}
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum Recent {
            Bare(Vec<ResultItem>),
            Wrapped { items: Vec<ResultItem> },
        }

        let recent: Recent = self
            .get_json(
                &self.config.endpoints.transcript_recent,
                &[("limit".to_string(), limit.to_string())],
            )
            .await?;
        Ok(match recent {
            Recent::Bare(items) | Recent::Wrapped { items } => items,
        })
    }
}

#[async_trait]
impl AnalysisApi for HttpApi {
    #[instrument(skip(self, request), fields(analysis_id = %request.analysis_id), level = "debug")]
    async fn quick_analyze(&self, request: &RunRequest) -> GemmaResult<QuickAnalysis> {
        let analysis: QuickAnalysis = self
            .post_json(&self.config.endpoints.quick_analyze, &request.to_json())
            .await?;
        if !analysis.success {
            return Err(GemmaError::server(
                analysis
                    .error
                    .clone()
                    .unwrap_or_else(|| "analysis was not successful".to_string()),
            ));
        }
        Ok(analysis)
    }

    async fn release_session(&self) -> GemmaResult<()> {
        let url = self.config.url(&self.config.endpoints.release_session);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| GemmaError::transport_with_url(e.to_string(), &url))?;
        check_status(response, &url).await?;
        Ok(())
    }
}

#[async_trait]
impl ArchiveApi for HttpApi {
    async fn list_artifacts(&self, offset: u32, limit: u32) -> GemmaResult<ArtifactPage> {
        self.get_json(
            &self.config.endpoints.artifacts,
            &[
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), limit.to_string()),
            ],
        )
        .await
    }

    async fn get_artifact(&self, artifact_id: &str) -> GemmaResult<Option<Artifact>> {
        let url = self.url_with_segments(&self.config.endpoints.artifacts, &[artifact_id])?;
        match self.get_url::<Option<Artifact>>(url, &[]).await {
            Ok(artifact) => Ok(artifact.filter(|a| !a.body.trim().is_empty())),
            Err(GemmaError::Http { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                debug!(artifact_id, "Artifact not found on server");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn chat_on_artifact(
        &self,
        artifact_id: &str,
        request: &ChatRequest,
    ) -> GemmaResult<ChatReply> {
        let url =
            self.url_with_segments(&self.config.endpoints.artifacts, &[artifact_id, "chat"])?;
        self.post_url(url, request).await
    }

    async fn legacy_chat(&self, request: &ChatRequest) -> GemmaResult<ChatReply> {
        self.post_json(&self.config.endpoints.legacy_chat, request)
            .await
    }
}

#[async_trait]
impl EventSource for HttpApi {
    #[instrument(skip(self, request), fields(analysis_id = %request.analysis_id))]
    async fn open(&self, request: &RunRequest) -> GemmaResult<EventStream> {
        let url = self.config.url(&self.config.endpoints.stream_start);
        let payload = request.encode_payload()?;
        let response = self
            .stream_client
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&[
                ("payload", payload.as_str()),
                ("analysis_id", request.analysis_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| GemmaError::transport_with_url(e.to_string(), &url))?;
        let response = check_status(response, &url).await?;
        debug!("Event stream opened");

        Ok(decode_event_stream(response.bytes_stream()))
    }
}
