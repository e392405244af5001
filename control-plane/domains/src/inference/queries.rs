// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde_json::{json, Value};
use std::sync::Arc;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::InferenceBackend;
use super::model::{InferenceModel, MODEL_TYPES};

pub fn units(backend: &Arc<InferenceBackend>) -> Vec<Unit> {
    vec![models_unit(backend), voices_unit(backend)]
}

pub(crate) fn models_schema() -> Schema {
    Schema::object().property(
        "models",
        Schema::array(
            Schema::object()
                .property("id", Schema::string())
                .property("name", Schema::string())
                .property("type", Schema::string().one_of(MODEL_TYPES))
                .property("provider", Schema::string())
                .property("description", Schema::string())
                .property("max_tokens", Schema::number())
                .property("modalities", Schema::string_array()),
        ),
    )
}

/// `{"models": [...]}` projection shared with the models resource.
pub(crate) fn models_projection(models: &[InferenceModel]) -> Value {
    let models: Vec<Value> = models.iter().map(InferenceModel::projection).collect();
    json!({ "models": models })
}

fn models_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::query("inference.models", "List available inference models")
        .input(
            Schema::object().property(
                "type",
                Schema::string()
                    .one_of(MODEL_TYPES)
                    .describe("Only list models of this type"),
            ),
        )
        .output(models_schema())
        .example(Example::new(
            "List language models",
            json!({"type": "llm"}),
            json!({
                "models": [{
                    "id": "llama3",
                    "name": "Llama 3",
                    "type": "llm",
                    "provider": "ollama",
                    "description": "",
                    "max_tokens": 8192,
                    "modalities": []
                }]
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), models)
}

async fn models(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let models = backend
        .provider()?
        .list_models(&ctx, input.non_empty_str("type"))
        .await
        .map_err(|e| e.with_context("list models"))?;
    Ok(models_projection(&models))
}

fn voices_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::query("inference.voices", "List available voices")
        .input(Schema::object().property("model", Schema::string().describe("TTS model identifier")))
        .output(
            Schema::object().property(
                "voices",
                Schema::array(
                    Schema::object()
                        .property("id", Schema::string())
                        .property("name", Schema::string())
                        .property("language", Schema::string())
                        .property("gender", Schema::string())
                        .property("description", Schema::string()),
                ),
            ),
        )
        .example(Example::new(
            "Voices for tts-1",
            json!({"model": "tts-1"}),
            json!({
                "voices": [{
                    "id": "alloy",
                    "name": "Alloy",
                    "language": "en",
                    "gender": "neutral",
                    "description": "Neutral and balanced"
                }]
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), voices)
}

async fn voices(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let voices = backend
        .provider()?
        .list_voices(&ctx, input.non_empty_str("model"))
        .await
        .map_err(|e| e.with_context("list voices"))?;
    let voices: Vec<Value> = voices.iter().map(|v| v.projection()).collect();
    Ok(json!({ "voices": voices }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::provider::{InferenceProvider, MockInferenceProvider};
    use asms_core::{ErrorCode, UnitRegistry};

    fn registry() -> UnitRegistry {
        let provider: Arc<dyn InferenceProvider> = Arc::new(MockInferenceProvider::new());
        let backend = Arc::new(InferenceBackend::new(Some(provider), None));
        let registry = UnitRegistry::new();
        registry.register_units(units(&backend)).unwrap();
        registry
    }

    #[tokio::test]
    async fn test_models_filter_by_type() {
        let registry = registry();
        let ctx = CallContext::background();

        let all = registry.execute(&ctx, "inference.models", json!({})).await.unwrap();
        assert_eq!(all["models"].as_array().unwrap().len(), 7);

        let diffusion = registry
            .execute(&ctx, "inference.models", json!({"type": "diffusion"}))
            .await
            .unwrap();
        let ids: Vec<&str> = diffusion["models"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["dall-e-3", "stable-diffusion-xl"]);

        let err = registry
            .execute(&ctx, "inference.models", json!({"type": "hologram"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_voices() {
        let out = registry()
            .execute(&CallContext::background(), "inference.voices", json!({"model": "tts-1"}))
            .await
            .unwrap();
        let voices = out["voices"].as_array().unwrap();
        assert_eq!(voices.len(), 6);
        assert_eq!(voices[4]["id"], "nova");
        assert_eq!(voices[4]["gender"], "female");
    }
}
