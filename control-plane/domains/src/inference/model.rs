// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use super::errors::InferenceError;

pub const MODEL_TYPES: [&str; 8] = [
    "llm",
    "asr",
    "tts",
    "embedding",
    "diffusion",
    "video_gen",
    "detection",
    "rerank",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub const ALL: [&'static str; 3] = ["system", "user", "assistant"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl FromStr for Role {
    type Err = InferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Role::System),
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            other => Err(InferenceError::InvalidParams(format!("unknown role: {other}"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn projection(&self) -> Value {
        json!({
            "prompt_tokens": self.prompt_tokens,
            "completion_tokens": self.completion_tokens,
            "total_tokens": self.total_tokens,
        })
    }
}

/// Sampling options. `None` leaves the provider default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f64>,
    pub top_k: Option<usize>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub stop: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompleteOptions {
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
    pub top_p: Option<f64>,
    pub stop: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageOptions {
    pub size: Option<String>,
    pub steps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<i64>,
    pub negative_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoOptions {
    /// Seconds.
    pub duration: Option<f64>,
    pub fps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub seed: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    pub id: String,
    pub model: String,
    pub content: String,
    pub finish_reason: String,
    pub usage: Usage,
    pub created: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionResponse {
    pub text: String,
    pub finish_reason: String,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResponse {
    pub embeddings: Vec<Vec<f64>>,
    pub usage: Usage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResponse {
    pub text: String,
    pub language: String,
    /// Seconds.
    pub duration: f64,
    pub segments: Vec<TranscriptionSegment>,
}

/// `audio` is the encoded payload as handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioResponse {
    pub audio: String,
    pub format: String,
    pub duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeneratedImage {
    pub base64: Option<String>,
    pub url: Option<String>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageGenerationResponse {
    pub images: Vec<GeneratedImage>,
    pub format: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoGenerationResponse {
    pub video: String,
    pub format: String,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RerankResult {
    pub document: String,
    pub score: f64,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RerankResponse {
    pub results: Vec<RerankResult>,
    pub usage: Usage,
}

/// `[x, y, width, height]`.
pub type BBox = [f64; 4];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
    pub bbox: BBox,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResponse {
    pub detections: Vec<Detection>,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice {
    pub id: String,
    pub name: String,
    pub language: String,
    pub gender: String,
    pub description: String,
}

impl Voice {
    pub fn projection(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "language": self.language,
            "gender": self.gender,
            "description": self.description,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InferenceModel {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: String,
    pub provider: String,
    pub description: String,
    pub max_tokens: u64,
    pub modalities: Vec<String>,
}

impl InferenceModel {
    pub fn new(id: &str, name: &str, model_type: &str, provider: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            model_type: model_type.to_string(),
            provider: provider.to_string(),
            description: String::new(),
            max_tokens: 0,
            modalities: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn projection(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "type": self.model_type,
            "provider": self.provider,
            "description": self.description,
            "max_tokens": self.max_tokens,
            "modalities": self.modalities,
        })
    }
}

/// One frame of a provider chat stream; the last one carries
/// `finish_reason` and usage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatStreamChunk {
    pub id: String,
    pub model: String,
    pub content: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompleteStreamChunk {
    pub id: String,
    pub model: String,
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}
