// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tests for config

use std::time::Duration;

use msnp_core::*;
use tempfile::TempDir;
use uuid::Uuid;

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("client.json");
    let config = ClientConfig::default()
        .with_scheduler_delay(Duration::from_millis(750))
        .with_max_payload(4096)
        .without_background_drain();

    config.save(&path).unwrap();
    let loaded = ClientConfig::load(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let result = ClientConfig::load(&dir.path().join("absent.json"));
    assert!(matches!(result, Err(MsnpError::Io(_))));
}

#[test]
fn test_load_invalid_json_is_serialization_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        ClientConfig::load(&path),
        Err(MsnpError::Serialization(_))
    ));
}

#[test]
fn test_from_env_overrides_and_ignores_garbage() {
    let guid = Uuid::new_v4();
    std::env::set_var("MSNP_SCHEDULER_DELAY_MS", "1200");
    std::env::set_var("MSNP_INVITATION_DELAY_MS", "soon");
    std::env::set_var("MSNP_BACKGROUND_DRAIN", "false");
    std::env::set_var("MSNP_MACHINE_GUID", guid.to_string());

    let config = ClientConfig::from_env();

    std::env::remove_var("MSNP_SCHEDULER_DELAY_MS");
    std::env::remove_var("MSNP_INVITATION_DELAY_MS");
    std::env::remove_var("MSNP_BACKGROUND_DRAIN");
    std::env::remove_var("MSNP_MACHINE_GUID");

    assert_eq!(config.scheduler_delay(), Duration::from_millis(1200));
    assert_eq!(
        config.invitation_delay_ms,
        msnp_core::config::DEFAULT_INVITATION_DELAY_MS
    );
    assert!(!config.background_drain);
    assert_eq!(config.machine_guid, guid);
}
