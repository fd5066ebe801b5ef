//! HTTP gateway for the RAG service.
//!
//! Two request/response calls, no streaming and no retries: `POST /chat` with
//! the whole transcript and `POST /upload` with a multipart PDF body. Every
//! failure is reported as a [`GatewayError`] carrying a readable cause.

use std::error::Error as StdError;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    ChatRequest, ChatResponse, Document, ErrorBody, Message, ModelId, UploadAck, UploadResponse,
};
use crate::utils::truncate_with_ellipsis;

/// Acknowledgment text used when the service does not return one.
pub const DEFAULT_UPLOAD_ACK: &str = "Document uploaded successfully";
const MAX_ERROR_DETAIL_BYTES: usize = 500;
const PDF_MIME: &str = "application/pdf";

// === Types ===

/// How a successful `/upload` response is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckMode {
    /// Any 2xx is success; a `{"message": "..."}` body supplies the
    /// acknowledgment text, otherwise the default text is used.
    #[default]
    Message,
    /// Any 2xx is success; the body is ignored.
    Status,
}

impl AckMode {
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "message" => Some(Self::Message),
            "status" => Some(Self::Status),
            _ => None,
        }
    }
}

/// Connection settings for [`RagClient`].
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: String,
    pub ack_mode: AckMode,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl ClientSettings {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ack_mode: AckMode::default(),
            request_timeout: Duration::from_secs(120),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// === Errors ===

/// Failure of a gateway call. Never fatal to the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The service could not be reached or the connection broke.
    #[error("{0}")]
    Transport(String),
    /// The transport gave up waiting for the service.
    #[error("request timed out: {0}")]
    Timeout(String),
    /// The service answered with a non-success status.
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    /// A success status arrived with a body we could not read.
    #[error("unexpected response from server: {0}")]
    Decode(String),
    /// The document could not be read before sending.
    #[error("{0}")]
    Io(String),
}

impl GatewayError {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        let described = describe_error_chain(err);
        if err.is_timeout() {
            Self::Timeout(described)
        } else if err.is_decode() {
            Self::Decode(described)
        } else {
            Self::Transport(described)
        }
    }
}

fn describe_error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !out.contains(&text) {
            out.push_str(": ");
            out.push_str(&text);
        }
        source = cause.source();
    }
    out
}

// === Gateway Trait ===

/// Boundary between the session controller and the remote service.
#[async_trait]
pub trait RagGateway: Send + Sync {
    /// Send the full transcript and return exactly the reply text.
    async fn send_chat_turn(
        &self,
        transcript: &[Message],
        model: &ModelId,
    ) -> Result<String, GatewayError>;

    /// Ship a document to the ingestion endpoint.
    async fn upload_document(&self, document: Document) -> Result<UploadAck, GatewayError>;
}

// === RagClient ===

/// reqwest-backed [`RagGateway`].
#[must_use]
#[derive(Debug, Clone)]
pub struct RagClient {
    http_client: reqwest::Client,
    base_url: String,
    ack_mode: AckMode,
}

impl RagClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = settings.base_url.trim_end_matches('/').to_string();
        tracing::info!(%base_url, ack_mode = ?settings.ack_mode, "RAG service client ready");

        Ok(Self {
            http_client,
            base_url,
            ack_mode: settings.ack_mode,
        })
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}/{name}", self.base_url)
    }
}

// === Trait Implementations ===

#[async_trait]
impl RagGateway for RagClient {
    async fn send_chat_turn(
        &self,
        transcript: &[Message],
        model: &ModelId,
    ) -> Result<String, GatewayError> {
        let url = self.endpoint("chat");
        let body = ChatRequest {
            messages: transcript,
            model: model.as_str(),
        };
        tracing::debug!(%url, %model, messages = transcript.len(), "sending chat turn");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(&err))?;
        let text = read_success_body(response, "chat").await?;

        let payload: ChatResponse = serde_json::from_str(&text).map_err(|err| {
            GatewayError::Decode(format!("invalid chat response body: {err}"))
        })?;
        Ok(payload.response)
    }

    async fn upload_document(&self, document: Document) -> Result<UploadAck, GatewayError> {
        let url = self.endpoint("upload");
        let Document { file_name, bytes } = document;
        tracing::debug!(%url, %file_name, size = bytes.len(), "uploading document");

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(PDF_MIME)
            .map_err(|err| GatewayError::Transport(describe_error_chain(&err)))?;
        let form = Form::new().part("file", part);

        let response = self
            .http_client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|err| GatewayError::from_reqwest(&err))?;
        let text = read_success_body(response, "upload").await?;

        match self.ack_mode {
            AckMode::Message => Ok(UploadAck {
                message: upload_message(&text)
                    .unwrap_or_else(|| DEFAULT_UPLOAD_ACK.to_string()),
            }),
            AckMode::Status => Ok(UploadAck {
                message: DEFAULT_UPLOAD_ACK.to_string(),
            }),
        }
    }
}

// === Response Helpers ===

async fn read_success_body(
    response: reqwest::Response,
    endpoint: &'static str,
) -> Result<String, GatewayError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|err| GatewayError::from_reqwest(&err))?;

    if status.is_success() {
        tracing::debug!(endpoint, status = status.as_u16(), "request succeeded");
        return Ok(text);
    }

    let detail = error_detail(status, &text);
    tracing::warn!(endpoint, status = status.as_u16(), %detail, "request failed");
    Err(GatewayError::Status {
        status: status.as_u16(),
        detail,
    })
}

/// Acknowledgment text from a successful upload body, when it carries one.
fn upload_message(body: &str) -> Option<String> {
    serde_json::from_str::<UploadResponse>(body)
        .ok()
        .and_then(|payload| payload.message)
        .filter(|message| !message.trim().is_empty())
}

/// Pull a readable cause out of an error response body.
fn error_detail(status: StatusCode, body: &str) -> String {
    let detail = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(text),
        }) => text,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) => body.trim().to_string(),
    };
    if detail.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string();
    }
    truncate_with_ellipsis(&detail, MAX_ERROR_DETAIL_BYTES, "...")
}
