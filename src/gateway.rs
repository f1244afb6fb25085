//! Model gateway: request building, upload guard, retry, and response
//! normalization for the hosted language-model API.
//!
//! Two operations sit on top of one retrying call:
//!
//! - [`ModelGateway::analyze_documents`]: checks the upload ceiling, turns
//!   each upload into text or a raw document block, and recovers an
//!   [`ExtractedDiscovery`] from the reply.
//! - [`ModelGateway::generate_artifacts`]: sends the generation prompt,
//!   recovers an [`ArtifactBundle`], and fills missing architecture sections.
//!
//! # Retry Strategy
//!
//! - HTTP 502/503/504 → retry
//! - Timeouts, refused connections, resets, broken pipes → retry
//! - HTTP 429 → fail immediately with [`AppError::RateLimited`]
//! - Anything else → fail immediately
//! - Backoff: 500ms, then doubling; at most `max_retries` (2) retries
//!
//! The transport is a trait so the loop can be driven by a scripted fake in
//! tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::{ModelConfig, API_KEY_ENV};
use crate::error::{truncate_for_diagnostics, AppError, UpstreamResponse};
use crate::extract::{prepare_batch, ModelDocument};
use crate::models::{ArtifactBundle, DiscoveryRecord, ExtractedDiscovery, IncomingFile};
use crate::{prompts, repair, synthesize};

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One entry of a user message's content list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
    Document { source: DocumentSource },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSource {
    #[serde(rename = "type")]
    pub encoding: &'static str,
    pub media_type: String,
    pub data: String,
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }
}

/// Build the content list: extracted texts, then raw documents, then the
/// instruction block.
pub fn build_content(documents: Vec<ModelDocument>, instructions: &str) -> Vec<ContentBlock> {
    let (texts, binaries): (Vec<_>, Vec<_>) = documents
        .into_iter()
        .partition(|d| matches!(d, ModelDocument::Text(_)));

    let mut content = Vec::with_capacity(texts.len() + binaries.len() + 1);
    for doc in texts.into_iter().chain(binaries) {
        content.push(match doc {
            ModelDocument::Text(text) => ContentBlock::Text { text },
            ModelDocument::Binary { media_type, data } => ContentBlock::Document {
                source: DocumentSource {
                    encoding: "base64",
                    media_type,
                    data,
                },
            },
        });
    }
    content.push(ContentBlock::text(instructions));
    content
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a [ContentBlock],
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: [Message<'a>; 1],
}

/// Raw HTTP exchange result, before status classification.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

#[derive(Debug, Clone)]
pub enum TransportError {
    /// Timeout, connection reset, or broken pipe.
    Transient(String),
    Fatal(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Transient(e) | TransportError::Fatal(e) => f.write_str(e),
        }
    }
}

/// Sends one serialized request to the model API.
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn send(&self, api_key: &str, body: &Value) -> Result<TransportResponse, TransportError>;
}

/// [`ModelTransport`] over `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
    url: String,
}

impl ReqwestTransport {
    pub fn new(config: &ModelConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("HTTP client: {}", e)))?;
        Ok(Self {
            client,
            url: format!("{}/v1/messages", config.api_base.trim_end_matches('/')),
        })
    }
}

fn is_transient_io(err: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            return matches!(
                io.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::TimedOut
            );
        }
        source = e.source();
    }
    false
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() || is_transient_io(&err) {
        TransportError::Transient(err.to_string())
    } else {
        TransportError::Fatal(err.to_string())
    }
}

#[async_trait]
impl ModelTransport for ReqwestTransport {
    async fn send(&self, api_key: &str, body: &Value) -> Result<TransportResponse, TransportError> {
        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body = response.text().await.map_err(classify)?;
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl From<&ModelConfig> for RetryPolicy {
    fn from(config: &ModelConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }
}

pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

/// Where the API key comes from. Production reads the environment on every
/// request so a rotated key is picked up without a restart.
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    Env,
    Fixed(Option<String>),
}

impl ApiKeySource {
    fn resolve(&self) -> Result<String, AppError> {
        let key = match self {
            ApiKeySource::Env => std::env::var(API_KEY_ENV).ok(),
            ApiKeySource::Fixed(key) => key.clone(),
        };
        key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            AppError::Configuration(format!(
                "Anthropic API key is not configured. Set {} in the environment.",
                API_KEY_ENV
            ))
        })
    }
}

/// Total approximate decoded size of a batch of base64 uploads.
pub fn approx_total_bytes(files: &[IncomingFile]) -> u64 {
    files.iter().map(IncomingFile::approx_decoded_bytes).sum()
}

/// Reject a batch whose decoded size exceeds `limit_bytes`.
pub fn check_upload_size(files: &[IncomingFile], limit_bytes: u64) -> Result<u64, AppError> {
    let measured_bytes = approx_total_bytes(files);
    tracing::info!(measured_bytes, limit_bytes, "upload size");
    if measured_bytes > limit_bytes {
        return Err(AppError::PayloadTooLarge {
            measured_bytes,
            limit_bytes,
        });
    }
    Ok(measured_bytes)
}

pub struct ModelGateway {
    transport: Arc<dyn ModelTransport>,
    config: ModelConfig,
    retry: RetryPolicy,
    api_key: ApiKeySource,
}

impl ModelGateway {
    pub fn new(transport: Arc<dyn ModelTransport>, config: ModelConfig) -> Self {
        let retry = RetryPolicy::from(&config);
        Self {
            transport,
            config,
            retry,
            api_key: ApiKeySource::Env,
        }
    }

    /// Gateway over HTTP using the environment API key.
    pub fn from_config(config: &ModelConfig) -> Result<Self, AppError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::new(Arc::new(transport), config.clone()))
    }

    pub fn with_api_key(mut self, source: ApiKeySource) -> Self {
        self.api_key = source;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Extract discovery fields from a batch of uploads.
    pub async fn analyze_documents(
        &self,
        files: &[IncomingFile],
    ) -> Result<ExtractedDiscovery, AppError> {
        let api_key = self.api_key.resolve()?;
        if files.is_empty() {
            return Err(AppError::BadRequest("No files could be processed".into()));
        }
        check_upload_size(files, self.config.effective_upload_max_bytes())?;

        let documents = prepare_batch(files).await;
        let content = build_content(documents, prompts::ANALYSIS_INSTRUCTIONS);
        let text = self
            .complete(&api_key, &content, self.config.analysis_max_tokens)
            .await?;
        repair::recover(&text)
    }

    /// Generate the artifact bundle for a discovery record.
    pub async fn generate_artifacts(
        &self,
        discovery: &DiscoveryRecord,
    ) -> Result<ArtifactBundle, AppError> {
        let api_key = self.api_key.resolve()?;
        let content = [ContentBlock::text(prompts::generation_prompt(discovery))];
        let text = self
            .complete(&api_key, &content, self.config.generation_max_tokens)
            .await?;
        let bundle: ArtifactBundle = repair::recover(&text)?;
        Ok(synthesize::fill_missing_architecture(bundle, discovery))
    }

    /// Send one user message and return the reply text.
    async fn complete(
        &self,
        api_key: &str,
        content: &[ContentBlock],
        max_tokens: u32,
    ) -> Result<String, AppError> {
        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens,
            messages: [Message {
                role: "user",
                content,
            }],
        };
        let body = serde_json::to_value(&request)
            .map_err(|e| AppError::BadRequest(format!("request encoding: {}", e)))?;

        let response = self.send_with_retry(api_key, &body).await?;
        normalize_response(response)
    }

    async fn send_with_retry(
        &self,
        api_key: &str,
        body: &Value,
    ) -> Result<TransportResponse, AppError> {
        let mut backoff = self.retry.initial_backoff;
        let mut attempt = 0;

        loop {
            let outcome = self.transport.send(api_key, body).await;
            let retryable = match &outcome {
                Ok(resp) => is_transient_status(resp.status),
                Err(TransportError::Transient(_)) => true,
                Err(TransportError::Fatal(_)) => false,
            };

            if retryable && attempt < self.retry.max_retries {
                attempt += 1;
                match &outcome {
                    Ok(resp) => tracing::warn!(
                        status = resp.status,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient upstream status, retrying"
                    ),
                    Err(e) => tracing::warn!(
                        error = %e,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        "transient transport error, retrying"
                    ),
                }
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                continue;
            }

            return outcome.map_err(|e| AppError::Transport(e.to_string()));
        }
    }
}

/// Map a final transport response to reply text or a typed error.
pub fn normalize_response(response: TransportResponse) -> Result<String, AppError> {
    let status = response.status;
    if (200..300).contains(&status) {
        return reply_text(&response.body);
    }

    let upstream = UpstreamResponse {
        status,
        headers: response.headers,
        raw: truncate_for_diagnostics(&response.body),
    };
    tracing::error!(status, raw = %upstream.raw, "upstream API returned an error");

    Err(match status {
        429 => AppError::RateLimited(upstream),
        s if is_transient_status(s) => AppError::TransientUpstream(upstream),
        _ => AppError::Upstream(upstream),
    })
}

/// Pull `content[0].text` out of a Messages API success body.
fn reply_text(body: &str) -> Result<String, AppError> {
    let malformed = || AppError::MalformedModelOutput {
        raw: truncate_for_diagnostics(body),
    };
    let value: Value = serde_json::from_str(body).map_err(|_| malformed())?;
    value
        .get("content")
        .and_then(|c| c.get(0))
        .and_then(|block| block.get("text"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(malformed)
}
