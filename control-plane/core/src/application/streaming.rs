// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Streaming Runtime
//!
//! Bridges a provider stream (a bounded `mpsc` receiver the provider feeds)
//! to the caller's outbound [`StreamChunk`] channel.
//!
//! Exactly one worker task drains the provider and forwards frames in
//! producer order. Its terminal status comes back over a `oneshot`, the
//! capacity-one error channel. The caller's side returns as soon as either
//! the worker reports or the context finishes; on cancellation the worker
//! is cancelled too and pending provider frames are dropped. The outbound
//! channel is never closed here.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::domain::context::CallContext;
use crate::domain::errors::{UnitError, UnitResult};
use crate::domain::unit::StreamChunk;

pub const DEFAULT_STREAM_CAPACITY: usize = 10;

/// Forward every item of `source` to `outbound`, converted by `to_chunk`.
/// Returns the number of frames forwarded, or `ctx.err()` verbatim when the
/// context finishes first.
pub async fn forward_stream<T, C>(
    ctx: &CallContext,
    unit: &str,
    source: mpsc::Receiver<T>,
    outbound: &mpsc::Sender<StreamChunk>,
    to_chunk: C,
) -> UnitResult<usize>
where
    T: Send + 'static,
    C: Fn(T) -> StreamChunk + Send + 'static,
{
    let (status_tx, status_rx) = oneshot::channel();
    let worker_ctx = ctx.child();
    let worker_token = worker_ctx.token().clone();
    let outbound = outbound.clone();
    let unit = unit.to_string();

    tokio::spawn(async move {
        let status = pump(&worker_ctx, &unit, source, &outbound, to_chunk).await;
        // receiver is gone when the caller already returned on cancellation
        let _ = status_tx.send(status);
    });

    tokio::select! {
        biased;
        _ = ctx.done() => {
            worker_token.cancel();
            debug!("stream cancelled by caller context");
            Err(ctx.err())
        }
        status = status_rx => status.unwrap_or_else(|_| {
            Err(UnitError::internal("stream worker exited without a status"))
        }),
    }
}

async fn pump<T, C>(
    ctx: &CallContext,
    unit: &str,
    mut source: mpsc::Receiver<T>,
    outbound: &mpsc::Sender<StreamChunk>,
    to_chunk: C,
) -> UnitResult<usize>
where
    C: Fn(T) -> StreamChunk,
{
    let mut forwarded = 0usize;
    loop {
        let item = tokio::select! {
            biased;
            _ = ctx.done() => return Err(ctx.err()),
            item = source.recv() => item,
        };
        let Some(item) = item else {
            debug!(unit = %unit, chunks = forwarded, "provider stream finished");
            return Ok(forwarded);
        };

        tokio::select! {
            biased;
            _ = ctx.done() => return Err(ctx.err()),
            sent = outbound.send(to_chunk(item)) => {
                if sent.is_err() {
                    return Err(UnitError::internal("stream receiver closed"));
                }
            }
        }

        forwarded += 1;
        metrics::counter!("asms_stream_chunks_total", "unit" => unit.to_string()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorCode;
    use serde_json::Map;
    use std::time::Duration;

    fn text_chunk(text: String) -> StreamChunk {
        StreamChunk::content(text, Map::new())
    }

    #[tokio::test]
    async fn test_forwards_all_frames_in_order() {
        let (provider_tx, provider_rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        tokio::spawn(async move {
            for word in ["Hello", " ", "world"] {
                provider_tx.send(word.to_string()).await.unwrap();
            }
        });

        let (outbound, mut caller_rx) = mpsc::channel(16);
        let forwarded = forward_stream(&CallContext::background(), "demo.say", provider_rx, &outbound, text_chunk)
            .await
            .unwrap();

        assert_eq!(forwarded, 3);
        let mut frames = Vec::new();
        while let Ok(chunk) = caller_rx.try_recv() {
            assert_eq!(chunk.chunk_type, "content");
            frames.push(chunk.data.as_str().unwrap().to_string());
        }
        assert_eq!(frames.concat(), "Hello world");
        assert!(!outbound.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_returns_context_error_and_stops_frames() {
        let (provider_tx, provider_rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        tokio::spawn(async move {
            let mut i = 0u64;
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                if provider_tx.send(format!("tok{}", i)).await.is_err() {
                    break;
                }
                i += 1;
            }
        });

        let ctx = CallContext::background();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let (outbound, mut caller_rx) = mpsc::channel(64);
        let err = forward_stream(&ctx, "demo.say", provider_rx, &outbound, text_chunk)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);

        let mut received = 0;
        while caller_rx.try_recv().is_ok() {
            received += 1;
        }
        assert!(received <= 5);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(caller_rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_surfaces_deadline_exceeded() {
        let (_provider_tx, provider_rx) = mpsc::channel::<String>(DEFAULT_STREAM_CAPACITY);
        let ctx = CallContext::background().with_timeout(Duration::from_millis(30));
        let (outbound, _caller_rx) = mpsc::channel(4);

        let err = forward_stream(&ctx, "demo.say", provider_rx, &outbound, text_chunk)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DeadlineExceeded);
    }

    #[tokio::test]
    async fn test_closed_outbound_is_internal_error() {
        let (provider_tx, provider_rx) = mpsc::channel(DEFAULT_STREAM_CAPACITY);
        provider_tx.send("x".to_string()).await.unwrap();
        let (outbound, caller_rx) = mpsc::channel(1);
        drop(caller_rx);

        let err = forward_stream(&CallContext::background(), "demo.say", provider_rx, &outbound, text_chunk)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }
}
