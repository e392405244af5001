// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Unit discovery: `units` and `describe`.

use anyhow::{Context, Result};
use colored::Colorize;

use asms_core::UnitKind;

use crate::output::print_json;
use crate::runtime::{unit_error, Runtime};

pub fn list(runtime: &Runtime, domain: Option<&str>) -> Result<()> {
    let units = match domain {
        Some(domain) => runtime.registry().units_in_domain(domain),
        None => runtime.registry().units(),
    };
    if units.is_empty() {
        println!("{}", "No units registered.".yellow());
        return Ok(());
    }

    let width = units.iter().map(|u| u.name().len()).max().unwrap_or(0);
    for unit in &units {
        let kind = match unit.kind() {
            UnitKind::Command => "command".green(),
            UnitKind::Query => "query".blue(),
        };
        let streaming = if unit.supports_streaming() {
            " (stream)".dimmed().to_string()
        } else {
            String::new()
        };
        println!(
            "{:width$}  {:7}  {}{}",
            unit.name().bold(),
            kind,
            unit.description(),
            streaming,
            width = width
        );
    }
    Ok(())
}

pub fn describe(runtime: &Runtime, name: &str) -> Result<()> {
    let unit = runtime
        .registry()
        .unit(name)
        .map_err(unit_error)
        .with_context(|| format!("Unknown unit {name:?}; run `asms units` to list them"))?;
    print_json(unit.descriptor())
}
