// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod registry;
pub mod streaming;
pub mod watch;

pub use registry::UnitRegistry;
pub use streaming::{forward_stream, DEFAULT_STREAM_CAPACITY};
pub use watch::{
    fetch_from, spawn_poller, ChangeDetector, Constant, CountDiff, Fetch, FieldDiff, PollSpec,
    SharedPoller, WatcherList, DEFAULT_WATCH_CAPACITY,
};
