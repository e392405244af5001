// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! `exec` and `stream`: run one unit against the in-process control plane.

use anyhow::Result;
use std::process::ExitCode;
use tokio::sync::mpsc;
use tracing::debug;

use asms_core::CallContext;

use crate::output::{print_events, print_json, print_json_line, print_unit_error};
use crate::runtime::{parse_input, Runtime};

pub async fn exec(runtime: &Runtime, name: &str, input: Option<&str>, show_events: bool) -> Result<ExitCode> {
    let input = parse_input(input)?;
    let ctx = CallContext::background();
    debug!(unit = %name, request_id = %ctx.request_id(), "executing unit");

    let code = match runtime.registry().execute(&ctx, name, input).await {
        Ok(output) => {
            print_json(&output)?;
            ExitCode::SUCCESS
        }
        Err(err) => {
            print_unit_error(&err)?;
            ExitCode::FAILURE
        }
    };
    if show_events {
        print_events(&runtime.events.events());
    }
    Ok(code)
}

/// Print frames as they arrive. Ctrl-C cancels the call.
pub async fn stream(runtime: &Runtime, name: &str, input: Option<&str>, show_events: bool) -> Result<ExitCode> {
    let input = parse_input(input)?;
    let ctx = CallContext::background();
    let (tx, mut rx) = mpsc::channel(runtime.config.streaming.channel_capacity);

    let printer = tokio::spawn(async move {
        let mut frames = 0usize;
        while let Some(chunk) = rx.recv().await {
            if let Err(err) = print_json_line(&chunk) {
                debug!(error = %err, "could not print frame");
            }
            frames += 1;
        }
        frames
    });

    let interrupt = ctx.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let result = runtime.registry().execute_stream(&ctx, name, input, &tx).await;
    watcher.abort();
    drop(tx);
    let frames = printer.await.unwrap_or_default();
    debug!(unit = %name, frames, "stream finished");

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            print_unit_error(&err)?;
            ExitCode::FAILURE
        }
    };
    if show_events {
        print_events(&runtime.events.events());
    }
    Ok(code)
}
