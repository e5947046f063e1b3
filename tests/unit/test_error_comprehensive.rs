use stageflow::core::error::AppError;
use stageflow::core::store::StoreError;
use stageflow::core::types::{ErrorCategory, ErrorSeverity};

#[test]
fn test_error_creation_all_categories() {
    let categories = vec![
        ErrorCategory::ValidationError,
        ErrorCategory::NotFound,
        ErrorCategory::StoreError,
        ErrorCategory::SerializationError,
        ErrorCategory::IoError,
        ErrorCategory::ConfigError,
        ErrorCategory::InternalError,
        ErrorCategory::Unknown,
    ];

    for category in categories {
        let error = AppError::new(category, "test message");
        assert_eq!(error.category, category);
        assert_eq!(error.message, "test message");
        assert!(error.context.is_empty());
        assert!(error.recovery_suggestions.is_empty());
        assert!(error.occurred_at <= chrono::Utc::now());
        assert!(error.source.is_none());
        assert!(error.code.starts_with("ERR-"));
    }
}

#[test]
fn test_error_severity_mapping() {
    let test_cases = vec![
        (ErrorCategory::ValidationError, ErrorSeverity::Error),
        (ErrorCategory::NotFound, ErrorSeverity::Error),
        (ErrorCategory::StoreError, ErrorSeverity::Error),
        (ErrorCategory::SerializationError, ErrorSeverity::Error),
        (ErrorCategory::IoError, ErrorSeverity::Error),
        (ErrorCategory::ConfigError, ErrorSeverity::Error),
        (ErrorCategory::InternalError, ErrorSeverity::Error),
        (ErrorCategory::Unknown, ErrorSeverity::Info),
    ];

    for (category, expected_severity) in test_cases {
        let error = AppError::new(category, "test");
        assert_eq!(error.severity(), expected_severity);
    }
}

#[test]
fn test_error_add_context() {
    let mut error = AppError::not_found("Stage not found: review");

    error.add_context("stageKey", "review");
    error.add_context("workflowId", "wf-1");

    assert_eq!(error.context.len(), 2);
    assert_eq!(error.context.get("stageKey").unwrap(), "review");
    assert_eq!(error.context.get("workflowId").unwrap(), "wf-1");

    let display = error.to_string();
    assert!(display.contains("NotFound: Stage not found: review"));
    assert!(display.contains("Context:"));
}

#[test]
fn test_error_builder_chain() {
    let error = AppError::new(ErrorCategory::ConfigError, "max reference depth must be positive")
        .with_code("WFS-CONFIG-001")
        .with_context("resolver.max_reference_depth")
        .with_suggestion("set resolver.max_reference_depth to 1 or more");

    assert_eq!(error.code, "WFS-CONFIG-001");
    assert_eq!(
        error.context.get("context").unwrap(),
        "resolver.max_reference_depth"
    );
    assert_eq!(error.recovery_suggestions.len(), 1);
    assert!(error
        .to_string()
        .starts_with("[WFS-CONFIG-001] ConfigError: max reference depth must be positive"));
}

#[test]
fn test_error_with_source() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
    let error = AppError::with_source(ErrorCategory::StoreError, "cannot write", Box::new(io));

    assert!(error.source.is_some());
    assert!(error.to_string().contains("Caused by: denied"));
}

#[test]
fn test_conversions_from_library_errors() {
    let io: AppError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
    assert_eq!(io.category, ErrorCategory::IoError);
    assert_eq!(io.code, "IO_ERROR");

    let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
    let json: AppError = json_err.into();
    assert_eq!(json.category, ErrorCategory::SerializationError);
    assert_eq!(json.code, "JSON_ERROR");

    let any: AppError = anyhow::anyhow!("opaque failure").into();
    assert_eq!(any.category, ErrorCategory::InternalError);
    assert_eq!(any.message, "opaque failure");
    assert!(!any.recovery_suggestions.is_empty());
}

#[test]
fn test_store_error_conversion() {
    let invalid: AppError = StoreError::InvalidId("../escape".to_string()).into();
    assert_eq!(invalid.category, ErrorCategory::ValidationError);
    assert_eq!(invalid.code, "WFS-STORE-001");

    let io: AppError = StoreError::Io {
        path: "/tmp/stageflow/workflows/wf.json".into(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
    }
    .into();
    assert_eq!(io.category, ErrorCategory::StoreError);
    assert!(io.message.contains("disk full"));
}
