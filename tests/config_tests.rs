use std::path::PathBuf;

use pdf_stamp::config::{Config, WriteInstruction};
use pdf_stamp::error::ConfigError;
use pretty_assertions::assert_eq;

#[test]
fn test_load_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
            "src": "template.pdf",
            "dest": "out/Invoice {DATE}.pdf",
            "fontSize": 11,
            "writes": [
                ["Name:", "Jane Doe", 40, 0],
                ["Date:", "Jan 5, 2024", 36.5, -1]
            ],
            "page": 2,
            "color": [1, 0, 0]
        }"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();

    assert_eq!(
        config,
        Config {
            src: PathBuf::from("template.pdf"),
            dest: "out/Invoice {DATE}.pdf".to_string(),
            font_size: 11.0,
            writes: vec![
                WriteInstruction::new("Name:", "Jane Doe", 40.0, 0.0),
                WriteInstruction::new("Date:", "Jan 5, 2024", 36.5, -1.0),
            ],
            page: 2,
            color: [1.0, 0.0, 0.0],
        }
    );
}

#[test]
fn test_validation_lists_every_issue() {
    let err = Config::from_json(
        r#"{"src": "", "dest": "", "fontSize": 0.5,
            "writes": [["", "x", 0, 0], ["Name:", "", 1, 1]],
            "page": 0, "color": [0, 2, 0]}"#,
    )
    .unwrap_err();

    let ConfigError::Invalid(issues) = &err else {
        panic!("expected validation error, got {err:?}");
    };
    assert_eq!(
        issues,
        &vec![
            "src: must not be empty".to_string(),
            "dest: must not be empty".to_string(),
            "fontSize: must be at least 1, got 0.5".to_string(),
            "page: must be at least 1".to_string(),
            "color.1: must be between 0 and 1, got 2".to_string(),
            "writes.0.0: search text must not be empty".to_string(),
            "writes.1.1: draw text must not be empty".to_string(),
        ]
    );
    assert!(err.to_string().starts_with("Validation error: src: must not be empty; "));
}

#[test]
fn test_write_tuples_need_four_elements() {
    let err = Config::from_json(
        r#"{"src": "a.pdf", "dest": "b.pdf", "fontSize": 12, "writes": [["Name:", "x", 1]]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_missing_and_unknown_fields_are_rejected() {
    let missing = Config::from_json(r#"{"src": "a.pdf", "dest": "b.pdf", "writes": []}"#);
    assert!(matches!(missing, Err(ConfigError::Parse(_))));

    let unknown = Config::from_json(
        r#"{"src": "a.pdf", "dest": "b.pdf", "fontSize": 12, "writes": [], "font": "Arial"}"#,
    );
    assert!(matches!(unknown, Err(ConfigError::Parse(_))));
}

#[test]
fn test_missing_config_file() {
    let err = Config::load("does/not/exist.json").unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }));
}
