// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Resource commands: `resources`, `get` and `watch`.

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;
use tracing::info;

use asms_core::{CallContext, ResourceOperation};

use crate::output::{print_json, print_json_line, print_unit_error};
use crate::runtime::Runtime;

pub fn list(runtime: &Runtime) -> Result<()> {
    println!("{}", "Resources:".bold());
    for resource in runtime.registry().resources() {
        println!("  {}  {}", resource.uri().bold(), resource.domain().dimmed());
    }
    println!();
    println!("{}", "Resource patterns:".bold());
    for factory in runtime.registry().factories() {
        println!("  {}", factory.pattern().bold());
    }
    Ok(())
}

pub async fn get(runtime: &Runtime, uri: &str) -> Result<ExitCode> {
    match runtime.registry().get_resource(&CallContext::background(), uri).await {
        Ok(snapshot) => {
            print_json(&snapshot)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            print_unit_error(&err)?;
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Print updates until Ctrl-C, or until `count` updates have arrived.
pub async fn watch(runtime: &Runtime, uri: &str, count: Option<usize>) -> Result<ExitCode> {
    let ctx = CallContext::background();
    let mut subscription = match runtime.registry().watch_resource(&ctx, uri) {
        Ok(subscription) => subscription,
        Err(err) => {
            print_unit_error(&err)?;
            return Ok(ExitCode::FAILURE);
        }
    };
    info!(uri = %uri, "watching resource");
    eprintln!("{}", format!("Watching {uri} (Ctrl-C to stop)").dimmed());

    let mut seen = 0usize;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            update = subscription.recv() => {
                let Some(update) = update else { break };
                if update.operation == ResourceOperation::Error {
                    eprintln!("{}", format!("update failed for {uri}").yellow());
                }
                print_json_line(&update)?;
                seen += 1;
                if count.is_some_and(|n| seen >= n) {
                    break;
                }
            }
        }
    }

    ctx.cancel();
    Ok(ExitCode::SUCCESS)
}
