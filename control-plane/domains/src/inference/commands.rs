// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Text inference commands: chat, complete, embed and rerank. Chat and
//! complete also stream.

use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use asms_core::application::forward_stream;
use asms_core::{CallContext, Example, Input, Schema, StreamChunk, Unit, UnitError, UnitResult};

use super::backend::InferenceBackend;
use super::errors::InferenceError;
use super::model::{
    ChatOptions, ChatStreamChunk, CompleteOptions, CompleteStreamChunk, Message, Role, Usage,
};

pub fn units(backend: &Arc<InferenceBackend>) -> Vec<Unit> {
    vec![
        chat_unit(backend),
        complete_unit(backend),
        embed_unit(backend),
        rerank_unit(backend),
    ]
}

pub(crate) fn require_model(input: &Input) -> UnitResult<&str> {
    input
        .non_empty_str("model")
        .ok_or_else(|| InferenceError::ModelNotSpecified.into())
}

pub(crate) fn require_text<'a>(input: &'a Input, field: &'static str) -> UnitResult<&'a str> {
    input
        .non_empty_str(field)
        .ok_or_else(|| InferenceError::Required(field).into())
}

/// Context for a failed provider call. Cancellation passes through as is.
pub(crate) fn failed(phrase: &'static str) -> impl FnOnce(UnitError) -> UnitError {
    move |err| {
        if err.is_cancellation() {
            err
        } else {
            err.with_context(phrase)
        }
    }
}

fn model_field() -> Schema {
    Schema::string().describe("Model identifier")
}

fn usage_schema() -> Schema {
    Schema::object()
        .property("prompt_tokens", Schema::number())
        .property("completion_tokens", Schema::number())
        .property("total_tokens", Schema::number())
}

fn stop_field() -> Schema {
    Schema::string_array().describe("Stop sequences")
}

struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    options: ChatOptions,
}

impl ChatRequest {
    fn parse(input: &Input) -> UnitResult<Self> {
        let model = require_model(input)?.to_string();
        let raw = input
            .array("messages")
            .filter(|m| !m.is_empty())
            .ok_or(InferenceError::RequiredList("messages"))?;

        let mut messages = Vec::with_capacity(raw.len());
        for (i, entry) in raw.iter().enumerate() {
            let role = entry.get("role").and_then(Value::as_str);
            let content = entry.get("content").and_then(Value::as_str);
            let (Some(role), Some(content)) = (role, content) else {
                return Err(InferenceError::InvalidMessage(i).into());
            };
            messages.push(Message::new(role.parse::<Role>()?, content));
        }

        Ok(Self {
            model,
            messages,
            options: ChatOptions {
                temperature: input.f64("temperature"),
                max_tokens: input.usize("max_tokens"),
                top_p: input.f64("top_p"),
                top_k: input.usize("top_k"),
                frequency_penalty: input.f64("frequency_penalty"),
                presence_penalty: input.f64("presence_penalty"),
                stop: input.string_list("stop").unwrap_or_default(),
            },
        })
    }
}

fn chat_unit(backend: &Arc<InferenceBackend>) -> Unit {
    let message = Schema::object()
        .property("role", Schema::string().one_of(Role::ALL))
        .property("content", Schema::string())
        .require(["role", "content"]);

    Unit::command("inference.chat", "Perform a chat completion with an AI model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("messages", Schema::array(message).describe("Conversation so far"))
                .property("temperature", Schema::number().range(0.0, 2.0))
                .property("max_tokens", Schema::number().min(1.0))
                .property("top_p", Schema::number().range(0.0, 1.0))
                .property("top_k", Schema::number().min(1.0))
                .property("frequency_penalty", Schema::number().range(-2.0, 2.0))
                .property("presence_penalty", Schema::number().range(-2.0, 2.0))
                .property("stop", stop_field())
                .property("stream", Schema::boolean().describe("Stream the response"))
                .require(["model", "messages"]),
        )
        .output(
            Schema::object()
                .property("content", Schema::string())
                .property("finish_reason", Schema::string())
                .property("usage", usage_schema())
                .property("model", Schema::string())
                .property("id", Schema::string()),
        )
        .example(Example::new(
            "Simple chat completion",
            json!({
                "model": "llama3",
                "messages": [{"role": "user", "content": "Hello!"}]
            }),
            json!({
                "content": "Hello! How can I help you today?",
                "finish_reason": "stop",
                "usage": {"prompt_tokens": 10, "completion_tokens": 8, "total_tokens": 18},
                "model": "llama3",
                "id": "chatcmpl-1a2b3c4d"
            }),
        ))
        .events(backend.events().clone())
        .stream(backend.clone(), chat_stream)
        .bind(backend.clone(), chat)
}

async fn chat(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let request = ChatRequest::parse(&input)?;
    let provider = backend.provider()?;
    let resp = backend
        .track(
            &ctx,
            &request.model,
            "chat",
            provider.chat(&ctx, &request.model, &request.messages, &request.options),
            |r| r.usage.total_tokens,
        )
        .await
        .map_err(failed("chat completion failed"))?;

    Ok(json!({
        "content": resp.content,
        "finish_reason": resp.finish_reason,
        "usage": resp.usage.projection(),
        "model": resp.model,
        "id": resp.id,
    }))
}

fn stream_metadata(finish_reason: Option<String>, model: String, id: String, usage: Option<Usage>) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("model".to_string(), Value::String(model));
    metadata.insert("id".to_string(), Value::String(id));
    if let Some(reason) = finish_reason {
        metadata.insert("finish_reason".to_string(), Value::String(reason));
    }
    if let Some(usage) = usage {
        metadata.insert("usage".to_string(), usage.projection());
    }
    metadata
}

async fn chat_stream(
    backend: Arc<InferenceBackend>,
    ctx: CallContext,
    input: Input,
    outbound: mpsc::Sender<StreamChunk>,
) -> UnitResult<()> {
    let request = ChatRequest::parse(&input)?;
    let provider = backend.provider()?;
    let total_tokens = Arc::new(AtomicU64::new(0));
    let seen = total_tokens.clone();

    let forward = async {
        let source = provider
            .chat_stream(&ctx, &request.model, &request.messages, &request.options)
            .await?;
        forward_stream(&ctx, "inference.chat", source, &outbound, move |chunk: ChatStreamChunk| {
            if let Some(usage) = chunk.usage {
                seen.store(usage.total_tokens, Ordering::Relaxed);
            }
            StreamChunk::content(chunk.content, stream_metadata(chunk.finish_reason, chunk.model, chunk.id, chunk.usage))
        })
        .await
    };

    backend
        .track(&ctx, &request.model, "chat_stream", forward, |_| {
            total_tokens.load(Ordering::Relaxed)
        })
        .await
        .map(|_| ())
        .map_err(failed("chat completion failed"))
}

struct CompleteRequest {
    model: String,
    prompt: String,
    options: CompleteOptions,
}

impl CompleteRequest {
    fn parse(input: &Input) -> UnitResult<Self> {
        Ok(Self {
            model: require_model(input)?.to_string(),
            prompt: require_text(input, "prompt")?.to_string(),
            options: CompleteOptions {
                temperature: input.f64("temperature"),
                max_tokens: input.usize("max_tokens"),
                top_p: input.f64("top_p"),
                stop: input.string_list("stop").unwrap_or_default(),
            },
        })
    }
}

fn complete_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.complete", "Perform a text completion with an AI model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("prompt", Schema::string().describe("Text to complete"))
                .property("temperature", Schema::number().range(0.0, 2.0))
                .property("max_tokens", Schema::number().min(1.0))
                .property("top_p", Schema::number().range(0.0, 1.0))
                .property("stop", stop_field())
                .property("stream", Schema::boolean().describe("Stream the response"))
                .require(["model", "prompt"]),
        )
        .output(
            Schema::object()
                .property("text", Schema::string())
                .property("finish_reason", Schema::string())
                .property("usage", usage_schema()),
        )
        .example(Example::new(
            "Complete a sentence",
            json!({"model": "llama3", "prompt": "The capital of France is"}),
            json!({
                "text": " Paris.",
                "finish_reason": "stop",
                "usage": {"prompt_tokens": 6, "completion_tokens": 2, "total_tokens": 8}
            }),
        ))
        .events(backend.events().clone())
        .stream(backend.clone(), complete_stream)
        .bind(backend.clone(), complete)
}

async fn complete(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let request = CompleteRequest::parse(&input)?;
    let provider = backend.provider()?;
    let resp = backend
        .track(
            &ctx,
            &request.model,
            "completion",
            provider.complete(&ctx, &request.model, &request.prompt, &request.options),
            |r| r.usage.total_tokens,
        )
        .await
        .map_err(failed("completion failed"))?;

    Ok(json!({
        "text": resp.text,
        "finish_reason": resp.finish_reason,
        "usage": resp.usage.projection(),
    }))
}

async fn complete_stream(
    backend: Arc<InferenceBackend>,
    ctx: CallContext,
    input: Input,
    outbound: mpsc::Sender<StreamChunk>,
) -> UnitResult<()> {
    let request = CompleteRequest::parse(&input)?;
    let provider = backend.provider()?;
    let total_tokens = Arc::new(AtomicU64::new(0));
    let seen = total_tokens.clone();

    let forward = async {
        let source = provider
            .complete_stream(&ctx, &request.model, &request.prompt, &request.options)
            .await?;
        forward_stream(&ctx, "inference.complete", source, &outbound, move |chunk: CompleteStreamChunk| {
            if let Some(usage) = chunk.usage {
                seen.store(usage.total_tokens, Ordering::Relaxed);
            }
            StreamChunk::content(chunk.text, stream_metadata(chunk.finish_reason, chunk.model, chunk.id, chunk.usage))
        })
        .await
    };

    backend
        .track(&ctx, &request.model, "completion_stream", forward, |_| {
            total_tokens.load(Ordering::Relaxed)
        })
        .await
        .map(|_| ())
        .map_err(failed("completion failed"))
}

/// `input` may be one string or a non-empty list of strings.
fn embed_inputs(input: &Input) -> UnitResult<Vec<String>> {
    match input.get("input") {
        Some(Value::String(text)) => Ok(vec![text.clone()]),
        Some(Value::Array(items)) if !items.is_empty() => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| InferenceError::InvalidEmbedInput.into())
            })
            .collect(),
        _ => Err(InferenceError::InvalidEmbedInput.into()),
    }
}

fn embed_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.embed", "Generate text embeddings using an embedding model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property(
                    "input",
                    Schema::string()
                        .or(Schema::string_array())
                        .describe("Text or array of texts to embed"),
                )
                .require(["model", "input"]),
        )
        .output(
            Schema::object()
                .property("embeddings", Schema::array(Schema::array(Schema::number())))
                .property(
                    "usage",
                    Schema::object()
                        .property("prompt_tokens", Schema::number())
                        .property("total_tokens", Schema::number()),
                ),
        )
        .example(Example::new(
            "Embed a single sentence",
            json!({"model": "text-embedding-3-small", "input": "Hello world"}),
            json!({
                "embeddings": [[0.1, 0.1, 0.1]],
                "usage": {"prompt_tokens": 2, "total_tokens": 2}
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), embed)
}

async fn embed(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let inputs = embed_inputs(&input)?;
    let provider = backend.provider()?;
    let resp = backend
        .track(&ctx, model, "embedding", provider.embed(&ctx, model, &inputs), |r| {
            r.usage.total_tokens
        })
        .await
        .map_err(failed("embedding failed"))?;

    Ok(json!({
        "embeddings": resp.embeddings,
        "usage": {
            "prompt_tokens": resp.usage.prompt_tokens,
            "total_tokens": resp.usage.total_tokens,
        },
    }))
}

fn rerank_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.rerank", "Rerank documents by relevance to a query")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("query", Schema::string().describe("Search query"))
                .property("documents", Schema::string_array().describe("Documents to rank"))
                .require(["model", "query", "documents"]),
        )
        .output(
            Schema::object().property(
                "results",
                Schema::array(
                    Schema::object()
                        .property("document", Schema::string())
                        .property("score", Schema::number())
                        .property("index", Schema::number()),
                ),
            ),
        )
        .example(Example::new(
            "Rank two passages",
            json!({
                "model": "rerank-v1",
                "query": "capital of France",
                "documents": ["Paris is the capital of France.", "Berlin is in Germany."]
            }),
            json!({
                "results": [
                    {"document": "Paris is the capital of France.", "score": 0.98, "index": 0},
                    {"document": "Berlin is in Germany.", "score": 0.12, "index": 1}
                ]
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), rerank)
}

async fn rerank(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let query = require_text(&input, "query")?;
    let documents = input
        .string_list("documents")
        .filter(|d| !d.is_empty())
        .ok_or(InferenceError::RequiredList("documents"))?;
    let provider = backend.provider()?;
    let resp = backend
        .track(&ctx, model, "rerank", provider.rerank(&ctx, model, query, &documents), |r| {
            r.usage.total_tokens
        })
        .await
        .map_err(failed("rerank failed"))?;

    Ok(json!({ "results": resp.results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::provider::{InferenceProvider, MockInferenceProvider, Operation};
    use asms_core::infrastructure::EventRecorder;
    use asms_core::{ErrorCode, UnitRegistry};
    use std::time::Duration;

    fn setup(mock: Arc<MockInferenceProvider>) -> (UnitRegistry, Arc<EventRecorder>) {
        let recorder = Arc::new(EventRecorder::new());
        let provider: Arc<dyn InferenceProvider> = mock;
        let backend = Arc::new(InferenceBackend::new(Some(provider), Some(recorder.clone())));
        let registry = UnitRegistry::new();
        registry.register_units(units(&backend)).unwrap();
        (registry, recorder)
    }

    fn hello() -> Value {
        json!({"model": "llama3", "messages": [{"role": "user", "content": "Hello, how are you?"}]})
    }

    #[tokio::test]
    async fn test_chat_output_and_request_events() {
        let (registry, recorder) = setup(Arc::new(MockInferenceProvider::new()));
        let ctx = CallContext::background().with_request_id("req-chat");

        let out = registry.execute(&ctx, "inference.chat", hello()).await.unwrap();
        assert_eq!(out["content"], "This is a mock response from the AI model.");
        assert_eq!(out["finish_reason"], "stop");
        assert_eq!(out["model"], "llama3");
        assert_eq!(out["usage"]["completion_tokens"], 50);
        assert!(out["id"].as_str().unwrap().starts_with("chatcmpl-"));

        let started = recorder.of_type("inference.request_started");
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].payload["request_id"], "req-chat");
        assert_eq!(started[0].payload["type"], "chat");
        let completed = recorder.of_type("inference.request_completed");
        assert_eq!(completed[0].payload["total_tokens"], out["usage"]["total_tokens"]);
    }

    #[tokio::test]
    async fn test_chat_rejects_bad_input() {
        let (registry, recorder) = setup(Arc::new(MockInferenceProvider::new()));
        let ctx = CallContext::background();

        let err = registry
            .execute(&ctx, "inference.chat", json!({"model": "", "messages": [{"role": "user", "content": "x"}]}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.message(), "model not specified");

        let err = registry
            .execute(&ctx, "inference.chat", json!({"model": "llama3", "messages": []}))
            .await
            .unwrap_err();
        assert_eq!(err.message(), "messages are required");

        let err = registry
            .execute(&ctx, "inference.chat", json!({"model": "llama3", "messages": [{"role": "robot", "content": "x"}]}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        let err = registry
            .execute(&ctx, "inference.chat", json!({"model": "llama3", "messages": [{"role": "user", "content": "x"}], "temperature": 3.5}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);

        assert!(recorder.of_type("inference.request_started").is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_contextualised() {
        let mock = Arc::new(MockInferenceProvider::new());
        mock.fail(Operation::Chat, Some(InferenceError::ModelNotLoaded("llama3".into()).into()));
        let (registry, recorder) = setup(mock);

        let err = registry
            .execute(&CallContext::background(), "inference.chat", hello())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InferenceModelNotLoaded);
        assert_eq!(err.domain(), Some("inference"));
        assert!(err.to_string().starts_with("chat completion failed: "));
        assert_eq!(recorder.of_type("inference.request_failed").len(), 1);
    }

    #[tokio::test]
    async fn test_provider_not_set() {
        let backend = Arc::new(InferenceBackend::new(None, None));
        let registry = UnitRegistry::new();
        registry.register_units(units(&backend)).unwrap();
        let err = registry
            .execute(&CallContext::background(), "inference.chat", hello())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_stream_frames_in_order() {
        let (registry, recorder) = setup(Arc::new(MockInferenceProvider::new()));
        let (tx, mut rx) = mpsc::channel(4);
        let ctx = CallContext::background();

        let collector = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(chunk) = rx.recv().await {
                frames.push(chunk);
            }
            frames
        });
        registry
            .execute_stream(&ctx, "inference.chat", hello(), &tx)
            .await
            .unwrap();
        drop(tx);
        let frames = collector.await.unwrap();

        let text: String = frames.iter().map(|f| f.data.as_str().unwrap()).collect();
        assert_eq!(text, "This is a mock response from the AI model.");
        assert!(frames.iter().all(|f| f.chunk_type == "content" && f.metadata["model"] == "llama3"));
        let last = frames.last().unwrap();
        assert_eq!(last.metadata["finish_reason"], "stop");
        assert!(frames[0].metadata.get("finish_reason").is_none());

        let completed = recorder.of_type("inference.request_completed");
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].payload["total_tokens"], last.metadata["usage"]["total_tokens"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_cancellation_is_reported_verbatim() {
        let mock = Arc::new(MockInferenceProvider::new().with_chunk_delay(Duration::from_millis(50)));
        let (registry, _) = setup(mock);
        let (tx, mut rx) = mpsc::channel(16);
        let ctx = CallContext::background();

        let canceller = ctx.clone();
        tokio::spawn(async move {
            let _ = rx.recv().await;
            canceller.cancel();
            while rx.recv().await.is_some() {}
        });
        let err = registry
            .execute_stream(&ctx, "inference.complete", json!({"model": "llama3", "prompt": "hi"}), &tx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);
        assert!(err.context().is_empty());
    }

    #[tokio::test]
    async fn test_complete_and_embed() {
        let (registry, _) = setup(Arc::new(MockInferenceProvider::new()));
        let ctx = CallContext::background();

        let out = registry
            .execute(&ctx, "inference.complete", json!({"model": "llama3", "prompt": "Once upon a time"}))
            .await
            .unwrap();
        assert_eq!(out["text"], "This is a mock completion response.");
        assert_eq!(out["usage"]["total_tokens"], 34);

        let out = registry
            .execute(&ctx, "inference.embed", json!({"model": "e", "input": ["abcd", "efgh"]}))
            .await
            .unwrap();
        assert_eq!(out["embeddings"].as_array().unwrap().len(), 2);
        assert_eq!(out["embeddings"][0].as_array().unwrap().len(), 1536);
        assert_eq!(out["usage"]["prompt_tokens"], 2);

        let out = registry
            .execute(&ctx, "inference.embed", json!({"model": "e", "input": "Hello world"}))
            .await
            .unwrap();
        assert_eq!(out["embeddings"].as_array().unwrap().len(), 1);

        let err = registry
            .execute(&ctx, "inference.embed", json!({"model": "e", "input": 42}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.details()["path"], "input");

        let err = registry
            .execute(&ctx, "inference.embed", json!({"model": "e", "input": []}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert_eq!(err.message(), "input must be string or array of strings");
    }

    #[tokio::test]
    async fn test_rerank_keeps_document_order() {
        let (registry, _) = setup(Arc::new(MockInferenceProvider::new()));
        let out = registry
            .execute(
                &CallContext::background(),
                "inference.rerank",
                json!({"model": "r", "query": "q", "documents": ["a", "b", "c"]}),
            )
            .await
            .unwrap();
        let results = out["results"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2]["document"], "c");
        assert_eq!(results[2]["index"], 2);
        assert!(results[0]["score"].as_f64().unwrap() > results[2]["score"].as_f64().unwrap());

        let err = registry
            .execute(
                &CallContext::background(),
                "inference.rerank",
                json!({"model": "r", "query": "q", "documents": []}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.message(), "documents are required");
    }
}
