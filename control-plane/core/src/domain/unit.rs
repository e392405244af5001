// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Units
//!
//! A [`Unit`] is a value pairing a [`UnitDescriptor`] (name, schemas,
//! examples) with an async handler. Commands and queries share the same
//! shape; streaming commands carry an extra stream handler.
//!
//! [`Unit::execute`] is the single entry point a transport calls. It raises
//! the lifecycle events, narrows the payload to an [`Input`], validates it
//! against the input schema, fills declared defaults and then runs the
//! handler.

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::context::CallContext;
use super::errors::{UnitError, UnitResult};
use super::events::{CorrelationScope, SharedPublisher};
use super::execution::ExecutionContext;
use super::input::Input;
use super::schema::Schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    Command,
    Query,
}

/// Documentation payload; never validated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: Value,
    pub output: Value,
    pub description: String,
}

impl Example {
    pub fn new(description: impl Into<String>, input: Value, output: Value) -> Self {
        Self {
            input,
            output,
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    pub name: String,
    pub domain: String,
    pub kind: UnitKind,
    pub description: String,
    pub input_schema: Schema,
    pub output_schema: Schema,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// Caller-facing stream frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub chunk_type: String,
    pub data: Value,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl StreamChunk {
    pub fn content(data: impl Into<Value>, metadata: Map<String, Value>) -> Self {
        Self {
            chunk_type: "content".to_string(),
            data: data.into(),
            metadata,
        }
    }
}

pub type UnitFuture = BoxFuture<'static, UnitResult<Value>>;
pub type StreamFuture = BoxFuture<'static, UnitResult<()>>;
pub type Handler = Arc<dyn Fn(CallContext, Input) -> UnitFuture + Send + Sync>;
pub type StreamHandler =
    Arc<dyn Fn(CallContext, Input, mpsc::Sender<StreamChunk>) -> StreamFuture + Send + Sync>;

#[derive(Clone)]
pub struct Unit {
    descriptor: UnitDescriptor,
    handler: Handler,
    stream_handler: Option<StreamHandler>,
    publisher: SharedPublisher,
    correlation: CorrelationScope,
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unit")
            .field("name", &self.descriptor.name)
            .field("kind", &self.descriptor.kind)
            .field("supports_streaming", &self.supports_streaming())
            .finish()
    }
}

impl Unit {
    pub fn command(name: impl Into<String>, description: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(UnitKind::Command, name.into(), description.into())
    }

    pub fn query(name: impl Into<String>, description: impl Into<String>) -> UnitBuilder {
        UnitBuilder::new(UnitKind::Query, name.into(), description.into())
    }

    pub fn descriptor(&self) -> &UnitDescriptor {
        &self.descriptor
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn domain(&self) -> &str {
        &self.descriptor.domain
    }

    pub fn kind(&self) -> UnitKind {
        self.descriptor.kind
    }

    pub fn description(&self) -> &str {
        &self.descriptor.description
    }

    pub fn input_schema(&self) -> &Schema {
        &self.descriptor.input_schema
    }

    pub fn output_schema(&self) -> &Schema {
        &self.descriptor.output_schema
    }

    pub fn examples(&self) -> &[Example] {
        &self.descriptor.examples
    }

    pub fn supports_streaming(&self) -> bool {
        self.stream_handler.is_some()
    }

    /// Replace the event sink for this unit's lifecycle events.
    pub fn with_events(mut self, publisher: SharedPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn with_correlation(mut self, scope: CorrelationScope) -> Self {
        self.correlation = scope;
        self
    }

    pub async fn execute(&self, ctx: &CallContext, input: Value) -> UnitResult<Value> {
        let exec = self.execution_context();
        exec.publish_started(&input);

        let result = match self.prepare(input) {
            Ok(input) => (self.handler)(ctx.clone(), input).await,
            Err(err) => Err(err),
        };

        match &result {
            Ok(output) => exec.publish_completed(output),
            Err(err) => exec.publish_failed(err),
        }
        result
    }

    /// Run the streaming variant. Frames go to `outbound`, which stays open:
    /// the caller owns it. The return value is the terminal status.
    pub async fn execute_stream(
        &self,
        ctx: &CallContext,
        input: Value,
        outbound: &mpsc::Sender<StreamChunk>,
    ) -> UnitResult<()> {
        let exec = self.execution_context();
        exec.publish_started(&input);

        let result = match (&self.stream_handler, self.prepare(input)) {
            (None, _) => Err(UnitError::invalid_input(format!(
                "unit {} does not support streaming",
                self.descriptor.name
            ))),
            (Some(_), Err(err)) => Err(err),
            (Some(stream), Ok(input)) => stream(ctx.clone(), input, outbound.clone()).await,
        };

        match &result {
            Ok(()) => exec.publish_completed(&Value::Null),
            Err(err) => exec.publish_failed(err),
        }
        result
    }

    fn execution_context(&self) -> ExecutionContext {
        ExecutionContext::new(
            self.publisher.clone(),
            self.descriptor.domain.clone(),
            self.descriptor.name.clone(),
        )
        .with_correlation(self.correlation)
    }

    fn prepare(&self, input: Value) -> UnitResult<Input> {
        let mut input = match input {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        if input.is_object() {
            let schema = &self.descriptor.input_schema;
            schema.validate(&input)?;
            schema.apply_defaults(&mut input);
        }
        Input::from_value(input)
    }
}

pub struct UnitBuilder {
    descriptor: UnitDescriptor,
    stream_handler: Option<StreamHandler>,
    publisher: SharedPublisher,
}

impl UnitBuilder {
    fn new(kind: UnitKind, name: String, description: String) -> Self {
        let domain = name.split_once('.').map(|(d, _)| d).unwrap_or(&name).to_string();
        Self {
            descriptor: UnitDescriptor {
                name,
                domain,
                kind,
                description,
                input_schema: Schema::object(),
                output_schema: Schema::object(),
                examples: Vec::new(),
            },
            stream_handler: None,
            publisher: None,
        }
    }

    pub fn input(mut self, schema: Schema) -> Self {
        self.descriptor.input_schema = schema;
        self
    }

    pub fn output(mut self, schema: Schema) -> Self {
        self.descriptor.output_schema = schema;
        self
    }

    pub fn example(mut self, example: Example) -> Self {
        self.descriptor.examples.push(example);
        self
    }

    pub fn events(mut self, publisher: SharedPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    /// Attach a stream handler bound to shared state.
    pub fn stream<S, F, Fut>(mut self, state: Arc<S>, f: F) -> Self
    where
        S: Send + Sync + 'static,
        F: Fn(Arc<S>, CallContext, Input, mpsc::Sender<StreamChunk>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UnitResult<()>> + Send + 'static,
    {
        self.stream_handler = Some(Arc::new(move |ctx, input, outbound| {
            f(state.clone(), ctx, input, outbound).boxed()
        }));
        self
    }

    /// Finish with a plain handler.
    pub fn handler<F, Fut>(self, f: F) -> Unit
    where
        F: Fn(CallContext, Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UnitResult<Value>> + Send + 'static,
    {
        Unit {
            descriptor: self.descriptor,
            handler: Arc::new(move |ctx, input| f(ctx, input).boxed()),
            stream_handler: self.stream_handler,
            publisher: self.publisher,
            correlation: CorrelationScope::default(),
        }
    }

    /// Finish with a handler bound to shared state, typically a domain
    /// service holding the store or provider.
    pub fn bind<S, F, Fut>(self, state: Arc<S>, f: F) -> Unit
    where
        S: Send + Sync + 'static,
        F: Fn(Arc<S>, CallContext, Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UnitResult<Value>> + Send + 'static,
    {
        self.handler(move |ctx, input| f(state.clone(), ctx, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCode;
    use crate::domain::events::{Event, EventPublisher};
    use parking_lot::Mutex;
    use serde_json::json;

    #[derive(Default)]
    struct Capture(Mutex<Vec<Event>>);

    impl EventPublisher for Capture {
        fn publish(&self, event: Event) {
            self.0.lock().push(event);
        }
    }

    fn echo_unit(capture: Arc<Capture>) -> Unit {
        Unit::command("demo.echo", "Echo the message back")
            .input(
                Schema::object()
                    .property("message", Schema::string().min_length(1))
                    .property("times", Schema::number().range(1.0, 3.0))
                    .require(["message"]),
            )
            .output(Schema::object().property("echo", Schema::string()))
            .example(Example::new("echo once", json!({"message": "hi"}), json!({"echo": "hi"})))
            .events(Some(capture))
            .handler(|_ctx, input| async move {
                let message = input.require_str("message")?;
                let times = input.i64("times").unwrap_or(1).max(1) as usize;
                Ok(json!({ "echo": message.repeat(times) }))
            })
    }

    #[tokio::test]
    async fn test_descriptor_derives_domain_from_name() {
        let unit = echo_unit(Arc::new(Capture::default()));
        assert_eq!(unit.domain(), "demo");
        assert_eq!(unit.kind(), UnitKind::Command);
        assert_eq!(unit.examples().len(), 1);
        assert!(!unit.supports_streaming());
    }

    #[tokio::test]
    async fn test_execute_publishes_started_and_completed() {
        let capture = Arc::new(Capture::default());
        let unit = echo_unit(capture.clone());

        let out = unit
            .execute(&CallContext::background(), json!({"message": "ab", "times": 2.0}))
            .await
            .unwrap();
        assert_eq!(out, json!({"echo": "abab"}));

        let events = capture.0.lock();
        let types: Vec<_> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(types, vec!["execution_started", "execution_completed"]);
    }

    #[tokio::test]
    async fn test_schema_failure_is_invalid_input_and_publishes_failed() {
        let capture = Arc::new(Capture::default());
        let unit = echo_unit(capture.clone());

        let err = unit
            .execute(&CallContext::background(), json!({"times": 9}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.to_string().contains("required field \"message\" is missing"));

        let events = capture.0.lock();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].event_type, "execution_failed");
    }

    #[tokio::test]
    async fn test_handler_sees_declared_defaults() {
        let unit = Unit::query("demo.page", "Echo the paging window")
            .input(
                Schema::object()
                    .property("limit", Schema::number().range(1.0, 50.0).default_value(10))
                    .property("offset", Schema::number().min(0.0).default_value(0)),
            )
            .handler(|_ctx, input| async move {
                Ok(json!({ "limit": input.i64("limit"), "offset": input.i64("offset") }))
            });

        let ctx = CallContext::background();
        let out = unit.execute(&ctx, Value::Null).await.unwrap();
        assert_eq!(out, json!({"limit": 10, "offset": 0}));

        let out = unit.execute(&ctx, json!({"offset": 5})).await.unwrap();
        assert_eq!(out, json!({"limit": 10, "offset": 5}));
    }

    #[tokio::test]
    async fn test_non_object_input_rejected() {
        let unit = echo_unit(Arc::new(Capture::default()));
        let err = unit
            .execute(&CallContext::background(), json!([1, 2]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("invalid input type"));
    }

    #[tokio::test]
    async fn test_execute_stream_on_plain_unit_fails() {
        let unit = echo_unit(Arc::new(Capture::default()));
        let (tx, _rx) = mpsc::channel(1);
        let err = unit
            .execute_stream(&CallContext::background(), json!({"message": "x"}), &tx)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_stream_handler_sends_frames_and_leaves_outbound_open() {
        let unit = Unit::command("demo.count", "Count up")
            .stream(Arc::new(3usize), |n, _ctx, _input, outbound| async move {
                for i in 0..*n {
                    outbound
                        .send(StreamChunk::content(i, Map::new()))
                        .await
                        .map_err(|_| UnitError::internal("closed"))?;
                }
                Ok(())
            })
            .handler(|_ctx, _input| async move { Ok(json!({})) });
        assert!(unit.supports_streaming());

        let (tx, mut rx) = mpsc::channel(8);
        unit.execute_stream(&CallContext::background(), Value::Null, &tx)
            .await
            .unwrap();

        let mut seen = Vec::new();
        while let Ok(chunk) = rx.try_recv() {
            seen.push(chunk.data);
        }
        assert_eq!(seen, vec![json!(0), json!(1), json!(2)]);
        assert!(!tx.is_closed());
    }
}
