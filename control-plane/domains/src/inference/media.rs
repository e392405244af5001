// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Media inference commands: speech, images, video and object detection.
//! Binary payloads travel as strings (typically base64) and are handed to
//! the provider as raw bytes.

use serde_json::{json, Value};
use std::sync::Arc;

use asms_core::{CallContext, Example, Input, Schema, Unit, UnitResult};

use super::backend::InferenceBackend;
use super::commands::{failed, require_model, require_text};
use super::model::{ImageOptions, VideoOptions};

pub fn units(backend: &Arc<InferenceBackend>) -> Vec<Unit> {
    vec![
        transcribe_unit(backend),
        synthesize_unit(backend),
        generate_image_unit(backend),
        generate_video_unit(backend),
        detect_unit(backend),
    ]
}

fn model_field() -> Schema {
    Schema::string().describe("Model identifier")
}

fn transcribe_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.transcribe", "Transcribe audio to text using an ASR model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("audio", Schema::string().describe("Encoded audio data"))
                .property("language", Schema::string().describe("Language hint, e.g. en"))
                .require(["model", "audio"]),
        )
        .output(
            Schema::object()
                .property("text", Schema::string())
                .property("language", Schema::string())
                .property("duration", Schema::number().describe("Duration in seconds"))
                .property(
                    "segments",
                    Schema::array(
                        Schema::object()
                            .property("id", Schema::number())
                            .property("start", Schema::number())
                            .property("end", Schema::number())
                            .property("text", Schema::string()),
                    ),
                ),
        )
        .example(Example::new(
            "Transcribe a short clip",
            json!({"model": "whisper-large-v3", "audio": "UklGRiQAAABXQVZF", "language": "en"}),
            json!({
                "text": "Hello world.",
                "language": "en",
                "duration": 1.2,
                "segments": [{"id": 0, "start": 0.0, "end": 1.2, "text": "Hello world."}]
            }),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), transcribe)
}

async fn transcribe(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let audio = require_text(&input, "audio")?;
    let language = input.non_empty_str("language");
    let provider = backend.provider()?;
    let resp = backend
        .track(
            &ctx,
            model,
            "transcription",
            provider.transcribe(&ctx, model, audio.as_bytes(), language),
            |_| 0,
        )
        .await
        .map_err(failed("transcription failed"))?;

    Ok(json!({
        "text": resp.text,
        "language": resp.language,
        "duration": resp.duration,
        "segments": resp.segments,
    }))
}

fn synthesize_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.synthesize", "Synthesize speech from text using a TTS model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("text", Schema::string().describe("Text to speak"))
                .property("voice", Schema::string().describe("Voice identifier"))
                .property("stream", Schema::boolean())
                .require(["model", "text"]),
        )
        .output(
            Schema::object()
                .property("audio", Schema::string().describe("Encoded audio data"))
                .property("format", Schema::string())
                .property("duration", Schema::number()),
        )
        .example(Example::new(
            "Speak a greeting",
            json!({"model": "tts-1", "text": "Hello there", "voice": "alloy"}),
            json!({"audio": "UklGRiQAAABXQVZF", "format": "wav", "duration": 0.55}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), synthesize)
}

async fn synthesize(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let text = require_text(&input, "text")?;
    let voice = input.non_empty_str("voice");
    let provider = backend.provider()?;
    let resp = backend
        .track(&ctx, model, "synthesis", provider.synthesize(&ctx, model, text, voice), |_| 0)
        .await
        .map_err(failed("synthesis failed"))?;

    Ok(json!({
        "audio": resp.audio,
        "format": resp.format,
        "duration": resp.duration,
    }))
}

fn generate_image_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.generate_image", "Generate images from text using a diffusion model")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("prompt", Schema::string().describe("Image description"))
                .property("size", Schema::string().describe("Image size, e.g. 1024x1024"))
                .property("steps", Schema::number().min(1.0).describe("Diffusion steps"))
                .property("width", Schema::number().min(1.0))
                .property("height", Schema::number().min(1.0))
                .property("negative_prompt", Schema::string())
                .property("seed", Schema::number())
                .require(["model", "prompt"]),
        )
        .output(
            Schema::object()
                .property(
                    "images",
                    Schema::array(
                        Schema::object()
                            .property("base64", Schema::string())
                            .property("url", Schema::string())
                            .property("data", Schema::string()),
                    ),
                )
                .property("format", Schema::string()),
        )
        .example(Example::new(
            "Generate one image",
            json!({"model": "stable-diffusion-xl", "prompt": "a lighthouse at dusk", "steps": 30}),
            json!({"images": [{"base64": "iVBORw0KGgo="}], "format": "png"}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), generate_image)
}

fn u32_field(input: &Input, key: &str) -> Option<u32> {
    input.usize(key).and_then(|v| u32::try_from(v).ok())
}

async fn generate_image(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let prompt = require_text(&input, "prompt")?;
    let options = ImageOptions {
        size: input.non_empty_str("size").map(str::to_string),
        steps: u32_field(&input, "steps"),
        width: u32_field(&input, "width"),
        height: u32_field(&input, "height"),
        seed: input.i64("seed"),
        negative_prompt: input.non_empty_str("negative_prompt").map(str::to_string),
    };
    let provider = backend.provider()?;
    let resp = backend
        .track(
            &ctx,
            model,
            "image_generation",
            provider.generate_image(&ctx, model, prompt, &options),
            |_| 0,
        )
        .await
        .map_err(failed("image generation failed"))?;

    let images: Vec<Value> = resp
        .images
        .iter()
        .map(|image| {
            let mut entry = serde_json::Map::new();
            if let Some(b64) = &image.base64 {
                entry.insert("base64".to_string(), json!(b64));
            }
            if let Some(url) = &image.url {
                entry.insert("url".to_string(), json!(url));
            }
            if let Some(data) = &image.data {
                entry.insert("data".to_string(), json!(data));
            }
            Value::Object(entry)
        })
        .collect();
    Ok(json!({ "images": images, "format": resp.format }))
}

fn generate_video_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.generate_video", "Generate video from text prompt")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("prompt", Schema::string().describe("Video description"))
                .property("duration", Schema::number().min(0.0).describe("Length in seconds"))
                .property("fps", Schema::number().min(1.0))
                .property("width", Schema::number().min(1.0))
                .property("height", Schema::number().min(1.0))
                .property("seed", Schema::number())
                .require(["model", "prompt"]),
        )
        .output(
            Schema::object()
                .property("video", Schema::string())
                .property("format", Schema::string())
                .property("duration", Schema::number()),
        )
        .example(Example::new(
            "Generate a short clip",
            json!({"model": "video-gen-1", "prompt": "waves on a beach", "duration": 4}),
            json!({"video": "AAAAIGZ0eXBpc29t", "format": "mp4", "duration": 4.0}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), generate_video)
}

async fn generate_video(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let prompt = require_text(&input, "prompt")?;
    let options = VideoOptions {
        duration: input.f64("duration"),
        fps: u32_field(&input, "fps"),
        width: u32_field(&input, "width"),
        height: u32_field(&input, "height"),
        seed: input.i64("seed"),
    };
    let provider = backend.provider()?;
    let resp = backend
        .track(
            &ctx,
            model,
            "video_generation",
            provider.generate_video(&ctx, model, prompt, &options),
            |_| 0,
        )
        .await
        .map_err(failed("video generation failed"))?;

    Ok(json!({
        "video": resp.video,
        "format": resp.format,
        "duration": resp.duration,
    }))
}

fn detect_unit(backend: &Arc<InferenceBackend>) -> Unit {
    Unit::command("inference.detect", "Detect objects in an image")
        .input(
            Schema::object()
                .property("model", model_field())
                .property("image", Schema::string().describe("Encoded image data"))
                .require(["model", "image"]),
        )
        .output(
            Schema::object().property(
                "detections",
                Schema::array(
                    Schema::object()
                        .property("label", Schema::string())
                        .property("confidence", Schema::number().range(0.0, 1.0))
                        .property("bbox", Schema::array(Schema::number()).describe("[x, y, width, height]")),
                ),
            ),
        )
        .example(Example::new(
            "Find people in a frame",
            json!({"model": "yolov8", "image": "iVBORw0KGgo="}),
            json!({"detections": [{"label": "person", "confidence": 0.95, "bbox": [100, 100, 200, 300]}]}),
        ))
        .events(backend.events().clone())
        .bind(backend.clone(), detect)
}

async fn detect(backend: Arc<InferenceBackend>, ctx: CallContext, input: Input) -> UnitResult<Value> {
    let model = require_model(&input)?;
    let image = require_text(&input, "image")?;
    let provider = backend.provider()?;
    let resp = backend
        .track(&ctx, model, "detection", provider.detect(&ctx, model, image.as_bytes()), |_| 0)
        .await
        .map_err(failed("detection failed"))?;

    Ok(json!({ "detections": resp.detections }))
}
