//! Config Validation Tests
//!
//! Typo detection and value validation for `neuraltrack.toml`, exercised
//! independently from the rest of the service.

use std::io::Write;

use neuraltrack::config::validation::{known_config_keys, suggest_correction, validate_unknown_keys};
use neuraltrack::config::{ConfigError, ServiceConfig};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_server_section_warns_with_suggestion() {
    let toml_str = r#"
[server]
max_body_byte = 2048
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert!(warnings[0].field.contains("max_body_byte"));
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("server.max_body_bytes")
    );
}

#[test]
fn far_off_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("[models]\nweights_directory = \"x\"\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn every_known_key_suggests_itself() {
    let known = known_config_keys();
    for key in &known {
        assert_eq!(suggest_correction(key, &known).as_deref(), Some(*key));
    }
}

#[test]
fn typos_never_fail_the_load() {
    let config = ServiceConfig::from_toml_str(
        r#"
[logging]
formt = "json"
format = "json"
"#,
    )
    .unwrap();
    assert!(config.logging.is_json());
}

// ============================================================================
// Value Validation
// ============================================================================

#[test]
fn unknown_log_format_rejected() {
    let err = ServiceConfig::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap_err();
    match err {
        ConfigError::Validation(errors) => {
            assert!(errors.iter().any(|e| e.contains("logging.format")));
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn wrong_value_type_is_parse_error() {
    let err = ServiceConfig::from_toml_str("[server]\nmax_body_bytes = \"big\"\n").unwrap_err();
    assert!(matches!(err, ConfigError::Parse(..)));
}

#[test]
fn load_from_file_reads_model_paths() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[models]
current_path = "/srv/models/current.json.zst"
projection_path = "/srv/models/projection.json.zst"
"#
    )
    .unwrap();

    let config = ServiceConfig::load_from_file(file.path()).unwrap();
    assert_eq!(
        config.models.current_path.to_str(),
        Some("/srv/models/current.json.zst")
    );
    assert_eq!(config.server, Default::default());
}

#[test]
fn load_from_missing_file_is_io_error() {
    let err = ServiceConfig::load_from_file(std::path::Path::new("/nonexistent/neuraltrack.toml"))
        .unwrap_err();
    assert!(matches!(err, ConfigError::Io(..)));
    assert!(err.to_string().contains("/nonexistent/neuraltrack.toml"));
}
