//! Conversation entities and the wire models for the RAG service endpoints.

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MODELS: &[&str] = &["deepseek-r1:1.5b", "deepseek-r1:7b"];

// === Core Message Types ===

/// Who produced a conversational turn.
///
/// The service expects the assistant role spelled `ai`; `assistant` is still
/// accepted when decoding so transcripts from OpenAI-style tooling load too.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "user")]
    User,
    #[serde(rename = "ai", alias = "assistant")]
    Assistant,
}

impl Role {
    /// Short label used when rendering the transcript.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "you",
            Role::Assistant => "ai",
        }
    }
}

/// One conversational turn. Immutable once appended to a transcript.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Request payload for `POST /chat`.
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub model: &'a str,
}

/// Success payload of `POST /chat`.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatResponse {
    pub response: String,
}

/// Success payload of `POST /upload`.
#[derive(Debug, Deserialize, Clone)]
pub struct UploadResponse {
    #[serde(default)]
    pub message: Option<String>,
}

/// FastAPI-style error body (`{"detail": ...}`).
#[derive(Debug, Deserialize, Clone)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

/// A document ready to be shipped to the upload endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Document {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// Acknowledgment returned by a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadAck {
    pub message: String,
}

// === Model Catalog ===

/// A model identifier taken from a [`ModelCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelId(String);

impl ModelId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Closed set of model identifiers the service is known to serve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    models: Vec<ModelId>,
    default_index: usize,
}

impl ModelCatalog {
    /// Build a catalog. Returns `None` when `models` is empty or the default
    /// is not one of its entries.
    #[must_use]
    pub fn new<I, S>(models: I, default_model: Option<&str>) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries: Vec<ModelId> = Vec::new();
        for model in models {
            let model = model.into().trim().to_string();
            if model.is_empty() || entries.iter().any(|m| m.0 == model) {
                continue;
            }
            entries.push(ModelId(model));
        }
        if entries.is_empty() {
            return None;
        }
        let default_index = match default_model {
            Some(name) => position_of(&entries, name)?,
            None => 0,
        };
        Some(Self {
            models: entries,
            default_index,
        })
    }

    /// Look up a user-supplied model name (case-insensitive).
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ModelId> {
        position_of(&self.models, name).map(|idx| self.models[idx].clone())
    }

    #[must_use]
    pub fn contains(&self, model: &ModelId) -> bool {
        self.models.contains(model)
    }

    #[must_use]
    pub fn default_model(&self) -> ModelId {
        self.models[self.default_index].clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelId> {
        self.models.iter()
    }
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            models: DEFAULT_MODELS
                .iter()
                .map(|m| ModelId((*m).to_string()))
                .collect(),
            default_index: 0,
        }
    }
}

fn position_of(models: &[ModelId], name: &str) -> Option<usize> {
    let wanted = name.trim();
    models
        .iter()
        .position(|m| m.0.eq_ignore_ascii_case(wanted))
}
