use std::time::Duration;

use super::*;

#[test]
fn defaults_resolve_without_any_sources() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.logging.level, LevelFilter::INFO);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert_eq!(settings.tracking.endpoint.as_str(), DEFAULT_TRACKING_ENDPOINT);
    assert_eq!(settings.tracking.flush_delay, Duration::from_millis(100));
    assert_eq!(settings.tracking.max_retries, 3);
    assert_eq!(settings.tracking.backoff_base, Duration::from_secs(1));
    assert_eq!(settings.search.prefetch_delay, Duration::from_secs(2));
    assert_eq!(settings.content.dir, PathBuf::from("content"));
    assert_eq!(settings.content.prefix, "posts");
    assert_eq!(settings.content.output, PathBuf::from("public/search-index.json"));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.content.dir = Some(PathBuf::from("articles"));
    raw.logging.level = Some("info".to_string());

    let overrides = BuildOverrides {
        content_dir: Some(PathBuf::from("drafts")),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_build_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.content.dir, PathBuf::from("drafts"));
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = BuildOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_build_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn invalid_log_level_is_rejected() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("shouting".to_string());

    let error = Settings::from_raw(raw).expect_err("invalid level");
    assert!(matches!(
        error,
        LoadError::Invalid {
            key: "logging.level",
            ..
        }
    ));
}

#[test]
fn malformed_endpoint_is_rejected() {
    let mut raw = RawSettings::default();
    raw.tracking.endpoint = Some("not a url".to_string());

    let error = Settings::from_raw(raw).expect_err("invalid endpoint");
    assert!(matches!(
        error,
        LoadError::Invalid {
            key: "tracking.endpoint",
            ..
        }
    ));
}

#[test]
fn zero_retries_is_rejected() {
    let mut raw = RawSettings::default();
    raw.tracking.max_retries = Some(0);

    let error = Settings::from_raw(raw).expect_err("zero retries");
    assert!(matches!(
        error,
        LoadError::Invalid {
            key: "tracking.max_retries",
            ..
        }
    ));
}

#[test]
fn parse_index_arguments() {
    let args = CliArgs::parse_from([
        "brezza-index",
        "--content-dir",
        "articles",
        "--prefix",
        "notes",
        "--output",
        "dist/search-index.json",
        "--log-json",
        "true",
    ]);

    assert_eq!(args.overrides.content_dir, Some(PathBuf::from("articles")));
    assert_eq!(args.overrides.prefix.as_deref(), Some("notes"));
    assert_eq!(
        args.overrides.output,
        Some(PathBuf::from("dist/search-index.json"))
    );
    assert_eq!(args.overrides.log_json, Some(true));
}
