// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Inference engine seam.
//!
//! Streaming calls report failures only when the stream is opened. Once a
//! receiver is handed back, the provider feeds it from its own task and
//! closes it by dropping the sender; it must stop when the context finishes.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use asms_core::application::DEFAULT_STREAM_CAPACITY;
use asms_core::{CallContext, UnitError, UnitResult};

use super::model::{
    AudioResponse, ChatOptions, ChatResponse, ChatStreamChunk, CompleteOptions, CompleteStreamChunk,
    CompletionResponse, Detection, DetectionResponse, EmbeddingResponse, GeneratedImage, ImageGenerationResponse,
    ImageOptions, InferenceModel, Message, RerankResponse, RerankResult, TranscriptionResponse,
    TranscriptionSegment, Usage, VideoGenerationResponse, VideoOptions, Voice,
};

#[async_trait]
pub trait InferenceProvider: Send + Sync {
    async fn chat(
        &self,
        ctx: &CallContext,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> UnitResult<ChatResponse>;

    async fn chat_stream(
        &self,
        ctx: &CallContext,
        model: &str,
        messages: &[Message],
        options: &ChatOptions,
    ) -> UnitResult<mpsc::Receiver<ChatStreamChunk>>;

    async fn complete(
        &self,
        ctx: &CallContext,
        model: &str,
        prompt: &str,
        options: &CompleteOptions,
    ) -> UnitResult<CompletionResponse>;

    async fn complete_stream(
        &self,
        ctx: &CallContext,
        model: &str,
        prompt: &str,
        options: &CompleteOptions,
    ) -> UnitResult<mpsc::Receiver<CompleteStreamChunk>>;

    async fn embed(&self, ctx: &CallContext, model: &str, inputs: &[String]) -> UnitResult<EmbeddingResponse>;

    async fn transcribe(
        &self,
        ctx: &CallContext,
        model: &str,
        audio: &[u8],
        language: Option<&str>,
    ) -> UnitResult<TranscriptionResponse>;

    async fn synthesize(
        &self,
        ctx: &CallContext,
        model: &str,
        text: &str,
        voice: Option<&str>,
    ) -> UnitResult<AudioResponse>;

    async fn generate_image(
        &self,
        ctx: &CallContext,
        model: &str,
        prompt: &str,
        options: &ImageOptions,
    ) -> UnitResult<ImageGenerationResponse>;

    async fn generate_video(
        &self,
        ctx: &CallContext,
        model: &str,
        prompt: &str,
        options: &VideoOptions,
    ) -> UnitResult<VideoGenerationResponse>;

    async fn rerank(
        &self,
        ctx: &CallContext,
        model: &str,
        query: &str,
        documents: &[String],
    ) -> UnitResult<RerankResponse>;

    async fn detect(&self, ctx: &CallContext, model: &str, image: &[u8]) -> UnitResult<DetectionResponse>;

    /// Catalogue, restricted to `model_type` (`llm`, `asr`, `tts`, ...) when given.
    async fn list_models(&self, ctx: &CallContext, model_type: Option<&str>) -> UnitResult<Vec<InferenceModel>>;

    async fn list_voices(&self, ctx: &CallContext, model: Option<&str>) -> UnitResult<Vec<Voice>>;
}

/// Provider calls a failure can be injected into on the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Chat,
    Complete,
    Embed,
    Transcribe,
    Synthesize,
    GenerateImage,
    GenerateVideo,
    Rerank,
    Detect,
    ListModels,
    ListVoices,
}

const MOCK_CHAT_REPLY: &str = "This is a mock response from the AI model.";
const MOCK_COMPLETION: &str = "This is a mock completion response.";
const MOCK_TRANSCRIPT: &str = "This is a mock transcription of the audio.";
const EMBEDDING_DIMS: usize = 1536;

/// Canned responses that honour the request shape: token counts follow the
/// input length, reranking keeps document order with falling scores.
pub struct MockInferenceProvider {
    chunk_delay: Duration,
    models: RwLock<Vec<InferenceModel>>,
    failures: RwLock<HashMap<Operation, UnitError>>,
}

impl Default for MockInferenceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInferenceProvider {
    pub fn new() -> Self {
        Self {
            chunk_delay: Duration::from_millis(20),
            models: RwLock::new(default_models()),
            failures: RwLock::new(HashMap::new()),
        }
    }

    /// Pause between streamed words.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    pub fn set_models(&self, models: Vec<InferenceModel>) {
        *self.models.write() = models;
    }

    /// Make `operation` (and its streaming variant) fail with `err`, or
    /// succeed again with `None`.
    pub fn fail(&self, operation: Operation, err: Option<UnitError>) {
        let mut failures = self.failures.write();
        match err {
            Some(err) => failures.insert(operation, err),
            None => failures.remove(&operation),
        };
    }

    fn check(&self, operation: Operation) -> UnitResult<()> {
        match self.failures.read().get(&operation) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn default_models() -> Vec<InferenceModel> {
    vec![
        InferenceModel::new("llama3", "Llama 3", "llm", "ollama").with_max_tokens(8192),
        InferenceModel::new("gpt-4", "GPT-4", "llm", "openai").with_max_tokens(8192),
        InferenceModel::new("whisper-large-v3", "Whisper Large V3", "asr", "ollama"),
        InferenceModel::new("tts-1", "TTS 1", "tts", "openai"),
        InferenceModel::new("text-embedding-3-small", "Text Embedding 3 Small", "embedding", "openai"),
        InferenceModel::new("dall-e-3", "DALL-E 3", "diffusion", "openai"),
        InferenceModel::new("stable-diffusion-xl", "Stable Diffusion XL", "diffusion", "local"),
    ]
}

fn voice(id: &str, name: &str, gender: &str, description: &str) -> Voice {
    Voice {
        id: id.to_string(),
        name: name.to_string(),
        language: "en".to_string(),
        gender: gender.to_string(),
        description: description.to_string(),
    }
}

fn default_voices() -> Vec<Voice> {
    vec![
        voice("alloy", "Alloy", "neutral", "Neutral and balanced"),
        voice("echo", "Echo", "male", "Warm and conversational"),
        voice("fable", "Fable", "neutral", "British accent"),
        voice("onyx", "Onyx", "male", "Deep and authoritative"),
        voice("nova", "Nova", "female", "Energetic and friendly"),
        voice("shimmer", "Shimmer", "female", "Soft and gentle"),
    ]
}

fn estimate_tokens<'a>(texts: impl IntoIterator<Item = &'a str>) -> u64 {
    texts.into_iter().map(|t| t.len() as u64 / 4).sum()
}

fn completion_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("chatcmpl-{}", &id[..8])
}

/// Split `text` into word frames; the final frame carries `finish_reason`.
fn word_frames(text: &str) -> Vec<(String, bool)> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let last = words.len().saturating_sub(1);
    words
        .iter()
        .enumerate()
        .map(|(i, word)| {
            let frame = if i == last {
                (*word).to_string()
            } else {
                format!("{word} ")
            };
            (frame, i == last)
        })
        .collect()
}

/// Feed `frames` into a bounded channel from a spawned task, pausing
/// `delay` before each one. Stops early when the context finishes or the
/// receiver goes away.
fn spawn_frames<T: Send + 'static>(ctx: &CallContext, delay: Duration, frames: Vec<T>) -> mpsc::Receiver<T> {
    let (tx, rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
    let ctx = ctx.child();
    tokio::spawn(async move {
        for frame in frames {
            tokio::select! {
                biased;
                _ = ctx.done() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            if tx.send(frame).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[async_trait]
impl InferenceProvider for MockInferenceProvider {
    async fn chat(
        &self,
        _ctx: &CallContext,
        model: &str,
        messages: &[Message],
        _options: &ChatOptions,
    ) -> UnitResult<ChatResponse> {
        self.check(Operation::Chat)?;
        let prompt_tokens = estimate_tokens(messages.iter().map(|m| m.content.as_str()));
        Ok(ChatResponse {
            id: completion_id(),
            model: model.to_string(),
            content: MOCK_CHAT_REPLY.to_string(),
            finish_reason: "stop".to_string(),
            usage: Usage::new(prompt_tokens, 50),
            created: chrono::Utc::now().timestamp(),
        })
    }

    async fn chat_stream(
        &self,
        ctx: &CallContext,
        model: &str,
        messages: &[Message],
        _options: &ChatOptions,
    ) -> UnitResult<mpsc::Receiver<ChatStreamChunk>> {
        self.check(Operation::Chat)?;
        let id = completion_id();
        let prompt_tokens = estimate_tokens(messages.iter().map(|m| m.content.as_str()));
        let frames = word_frames(MOCK_CHAT_REPLY)
            .into_iter()
            .map(|(content, last)| ChatStreamChunk {
                id: id.clone(),
                model: model.to_string(),
                content,
                finish_reason: last.then(|| "stop".to_string()),
                usage: last.then(|| Usage::new(prompt_tokens, 50)),
            })
            .collect();
        Ok(spawn_frames(ctx, self.chunk_delay, frames))
    }

    async fn complete(
        &self,
        _ctx: &CallContext,
        _model: &str,
        prompt: &str,
        _options: &CompleteOptions,
    ) -> UnitResult<CompletionResponse> {
        self.check(Operation::Complete)?;
        Ok(CompletionResponse {
            text: MOCK_COMPLETION.to_string(),
            finish_reason: "stop".to_string(),
            usage: Usage::new(estimate_tokens([prompt]), 30),
        })
    }

    async fn complete_stream(
        &self,
        ctx: &CallContext,
        model: &str,
        prompt: &str,
        _options: &CompleteOptions,
    ) -> UnitResult<mpsc::Receiver<CompleteStreamChunk>> {
        self.check(Operation::Complete)?;
        let id = completion_id();
        let prompt_tokens = estimate_tokens([prompt]);
        let frames = word_frames(MOCK_COMPLETION)
            .into_iter()
            .map(|(text, last)| CompleteStreamChunk {
                id: id.clone(),
                model: model.to_string(),
                text,
                finish_reason: last.then(|| "stop".to_string()),
                usage: last.then(|| Usage::new(prompt_tokens, 30)),
            })
            .collect();
        Ok(spawn_frames(ctx, self.chunk_delay, frames))
    }

    async fn embed(&self, _ctx: &CallContext, _model: &str, inputs: &[String]) -> UnitResult<EmbeddingResponse> {
        self.check(Operation::Embed)?;
        let prompt_tokens = estimate_tokens(inputs.iter().map(String::as_str));
        Ok(EmbeddingResponse {
            embeddings: inputs.iter().map(|_| vec![0.1; EMBEDDING_DIMS]).collect(),
            usage: Usage::new(prompt_tokens, 0),
        })
    }

    async fn transcribe(
        &self,
        _ctx: &CallContext,
        _model: &str,
        audio: &[u8],
        language: Option<&str>,
    ) -> UnitResult<TranscriptionResponse> {
        self.check(Operation::Transcribe)?;
        Ok(TranscriptionResponse {
            text: MOCK_TRANSCRIPT.to_string(),
            language: language.unwrap_or("en").to_string(),
            duration: audio.len() as f64 / 16_000.0,
            segments: vec![
                TranscriptionSegment {
                    id: 0,
                    start: 0.0,
                    end: 2.5,
                    text: "This is a mock transcription".to_string(),
                },
                TranscriptionSegment {
                    id: 1,
                    start: 2.5,
                    end: 5.0,
                    text: "of the audio.".to_string(),
                },
            ],
        })
    }

    async fn synthesize(
        &self,
        _ctx: &CallContext,
        _model: &str,
        text: &str,
        _voice: Option<&str>,
    ) -> UnitResult<AudioResponse> {
        self.check(Operation::Synthesize)?;
        Ok(AudioResponse {
            audio: "mock_audio_data".to_string(),
            format: "wav".to_string(),
            duration: text.chars().count() as f64 * 0.05,
        })
    }

    async fn generate_image(
        &self,
        _ctx: &CallContext,
        _model: &str,
        _prompt: &str,
        _options: &ImageOptions,
    ) -> UnitResult<ImageGenerationResponse> {
        self.check(Operation::GenerateImage)?;
        Ok(ImageGenerationResponse {
            images: vec![GeneratedImage {
                base64: Some("mock_base64_image_data".to_string()),
                ..GeneratedImage::default()
            }],
            format: "png".to_string(),
        })
    }

    async fn generate_video(
        &self,
        _ctx: &CallContext,
        _model: &str,
        _prompt: &str,
        options: &VideoOptions,
    ) -> UnitResult<VideoGenerationResponse> {
        self.check(Operation::GenerateVideo)?;
        Ok(VideoGenerationResponse {
            video: "mock_video_data".to_string(),
            format: "mp4".to_string(),
            duration: options.duration.unwrap_or(5.0),
        })
    }

    async fn rerank(
        &self,
        _ctx: &CallContext,
        _model: &str,
        query: &str,
        documents: &[String],
    ) -> UnitResult<RerankResponse> {
        self.check(Operation::Rerank)?;
        let results = documents
            .iter()
            .enumerate()
            .map(|(index, document)| RerankResult {
                document: document.clone(),
                score: 1.0 - 0.1 * index as f64,
                index,
            })
            .collect();
        let prompt_tokens = estimate_tokens(std::iter::once(query).chain(documents.iter().map(String::as_str)));
        Ok(RerankResponse {
            results,
            usage: Usage::new(prompt_tokens, 0),
        })
    }

    async fn detect(&self, _ctx: &CallContext, model: &str, _image: &[u8]) -> UnitResult<DetectionResponse> {
        self.check(Operation::Detect)?;
        Ok(DetectionResponse {
            detections: vec![
                Detection {
                    label: "person".to_string(),
                    confidence: 0.95,
                    bbox: [100.0, 100.0, 200.0, 300.0],
                },
                Detection {
                    label: "car".to_string(),
                    confidence: 0.87,
                    bbox: [350.0, 200.0, 150.0, 100.0],
                },
            ],
            model: model.to_string(),
        })
    }

    async fn list_models(&self, _ctx: &CallContext, model_type: Option<&str>) -> UnitResult<Vec<InferenceModel>> {
        self.check(Operation::ListModels)?;
        Ok(self
            .models
            .read()
            .iter()
            .filter(|m| model_type.is_none_or(|t| m.model_type == t))
            .cloned()
            .collect())
    }

    async fn list_voices(&self, _ctx: &CallContext, _model: Option<&str>) -> UnitResult<Vec<Voice>> {
        self.check(Operation::ListVoices)?;
        Ok(default_voices())
    }
}
