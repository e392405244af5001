// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Terminal rendering shared by the commands. Machine-readable payloads go
//! to stdout as JSON; decoration goes to stderr so output stays pipeable.

use anyhow::{Context, Result};
use colored::Colorize;
use serde::Serialize;

use asms_core::{Event, UnitError};

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to render JSON")?;
    println!("{text}");
    Ok(())
}

/// One JSON document per line, for streamed frames and watch updates.
pub fn print_json_line<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string(value).context("Failed to render JSON")?;
    println!("{text}");
    Ok(())
}

pub fn print_unit_error(err: &UnitError) -> Result<()> {
    eprintln!("{} {}", "✗".red(), err.to_string().red());
    let text = serde_json::to_string_pretty(&err.to_payload()).context("Failed to render error")?;
    println!("{text}");
    Ok(())
}

pub fn print_events(events: &[Event]) {
    if events.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{}", "Events:".bold());
    for event in events {
        eprintln!(
            "  {} {} {}",
            event.timestamp.format("%H:%M:%S%.3f").to_string().dimmed(),
            event.event_type.cyan(),
            event.payload
        );
    }
}
