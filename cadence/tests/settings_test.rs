//! Configuration file loading and precedence
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{io::Write, path::PathBuf};

use cadence::{
    Cli, ConfigError, Settings,
    settings::{RelaySettings, find_config_file},
};
use cadence_delivery::TlsMode;
use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write config");
    file
}

#[test]
fn test_parse_full_config_file() {
    let file = config_file(
        r#"(
            sender: Some("me@gmail.com"),
            sender_name: Some("Relay Probe"),
            password: Some("abcd efgh ijkl mnop"),
            recipient: Some("you@example.org"),
            delay_ms: Some(30000),
            max_count: Some(5),
            subject_prefix: Some("Probe"),
            html: Some(false),
            relay: (
                host: Some("smtp.example.net"),
                port: Some(465),
                tls: Some(tls),
                timeout_secs: Some(15),
            ),
        )"#,
    );

    let settings = Settings::from_file(file.path()).unwrap();

    assert_eq!(
        settings.relay,
        RelaySettings {
            host: Some("smtp.example.net".to_string()),
            port: Some(465),
            tls: Some(TlsMode::Tls),
            timeout_secs: Some(15),
        }
    );

    let resolved = settings.resolve().unwrap();
    assert_eq!(resolved.run.sender.to_string(), "\"Relay Probe\" <me@gmail.com>");
    assert_eq!(resolved.run.base_delay_ms, 30_000);
    assert_eq!(resolved.run.max_count, 5);
    assert_eq!(resolved.run.subject_prefix, "Probe");
    assert!(!resolved.run.html);
    assert_eq!(resolved.relay.port, 465);
    assert_eq!(resolved.relay.timeout_secs, 15);
}

#[test]
fn test_implicit_some_config_file() {
    let file = config_file(
        r#"#![enable(implicit_some)]
        (
            sender: "me@gmail.com",
            recipient: "you@example.org",
            max_count: 3,
        )"#,
    );

    let settings = Settings::from_file(file.path()).unwrap();

    assert_eq!(settings.sender.as_deref(), Some("me@gmail.com"));
    assert_eq!(settings.max_count, Some(3));
    assert_eq!(settings.password, None);
}

#[test]
fn test_empty_config_file_is_all_defaults() {
    let file = config_file("()");

    assert_eq!(Settings::from_file(file.path()).unwrap(), Settings::default());
}

#[test]
fn test_unknown_field_is_rejected() {
    let file = config_file(r#"(sender: Some("me@gmail.com"), colour: Some("blue"))"#);

    let err = Settings::from_file(file.path()).unwrap_err();

    assert!(matches!(err, ConfigError::Parse { .. }), "got {err:?}");
}

#[test]
fn test_load_overlays_cli_on_file() {
    let file = config_file(
        r#"(
            sender: Some("me@gmail.com"),
            password: Some("from-file"),
            recipient: Some("file@example.org"),
            delay_ms: Some(30000),
        )"#,
    );
    let cli = Cli {
        config: Some(file.path().to_path_buf()),
        password: Some("from-env".to_string()),
        max_count: Some(2),
        ..Cli::default()
    };

    let resolved = Settings::load(&cli).unwrap().resolve().unwrap();

    assert_eq!(resolved.relay.password, "from-env");
    assert_eq!(resolved.run.recipient, "file@example.org");
    assert_eq!(resolved.run.base_delay_ms, 30_000);
    assert_eq!(resolved.run.max_count, 2);
}

#[test]
fn test_load_with_missing_explicit_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cli = Cli {
        config: Some(dir.path().join("absent.ron")),
        ..Cli::default()
    };

    assert!(matches!(
        Settings::load(&cli).unwrap_err(),
        ConfigError::NotFound(_)
    ));
}

#[test]
fn test_first_existing_candidate_wins() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.ron");
    let present = dir.path().join("cadence.config.ron");
    std::fs::write(&present, "()").unwrap();
    let later = config_file("()");

    let found = find_config_file(
        None,
        &[missing, present.clone(), later.path().to_path_buf()],
    )
    .unwrap();

    assert_eq!(found, Some(present));
}

#[test]
fn test_explicit_file_beats_candidates() {
    let explicit = config_file("()");
    let candidate = config_file("()");

    let found = find_config_file(
        Some(explicit.path()),
        &[PathBuf::from(candidate.path())],
    )
    .unwrap();

    assert_eq!(found.as_deref(), Some(explicit.path()));
}
