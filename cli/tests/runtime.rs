// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use asms_control_plane::commands::{exec, resources};
use asms_control_plane::runtime::Runtime;
use std::process::ExitCode;

#[tokio::test]
async fn test_runtime_honours_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("asms.yaml");
    std::fs::write(
        &path,
        "watch:\n  service: 2s\n  channel_capacity: 4\ndevice:\n  temperature_alert_celsius: 70.0\n",
    )
    .unwrap();

    let runtime = Runtime::load(Some(path)).unwrap();
    assert_eq!(runtime.config.watch.service.as_secs(), 2);
    assert_eq!(runtime.config.watch.services.as_secs(), 60);
    assert_eq!(runtime.plane.devices.temperature_threshold(), 70.0);
}

#[tokio::test]
async fn test_missing_explicit_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Runtime::load(Some(dir.path().join("absent.yaml"))).is_err());
}

#[tokio::test]
async fn test_exec_exit_codes() {
    let runtime = Runtime::load(None).unwrap();

    let ok = exec::exec(&runtime, "service.list", Some("{}"), false).await.unwrap();
    assert_eq!(ok, ExitCode::SUCCESS);

    let failed = exec::exec(&runtime, "service.get", Some(r#"{"service_id": "svc-none"}"#), false)
        .await
        .unwrap();
    assert_eq!(failed, ExitCode::FAILURE);

    assert!(exec::exec(&runtime, "service.list", Some("{broken"), false).await.is_err());
    assert_eq!(runtime.events.of_type("execution_failed").len(), 1);
}

#[tokio::test]
async fn test_get_resource_exit_codes() {
    let runtime = Runtime::load(None).unwrap();
    assert_eq!(
        resources::get(&runtime, "asms://inference/models").await.unwrap(),
        ExitCode::SUCCESS
    );
    assert_eq!(
        resources::get(&runtime, "asms://unknown").await.unwrap(),
        ExitCode::FAILURE
    );
}
