//! Scenario loading errors.

use std::path::PathBuf;

use thiserror::Error;
use validator::ValidationErrors;

/// Failure to load a scenario fixture. Loading stops at the first error;
/// there is no partial scenario.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("scenario file not found: {0}")]
    FileNotFound(PathBuf),

    /// Settings violated a declared range or format constraint.
    #[error("invalid scenario settings: {}", render_field_errors(.0))]
    Validation(#[source] ValidationErrors),

    /// YAML or environment-override extraction failed. Task-tree shape
    /// errors surface here too, prefixed with the offending task key.
    #[error("scenario parsing error: {0}")]
    Parsing(#[from] figment::Error),
}

impl From<ValidationErrors> for ConfigError {
    fn from(errors: ValidationErrors) -> Self {
        ConfigError::Validation(errors)
    }
}

/// Flatten validator's per-field error map into one `field: message` line.
fn render_field_errors(errors: &ValidationErrors) -> String {
    let mut parts = Vec::new();
    for (field, errors) in errors.field_errors() {
        for error in errors {
            let message = match &error.message {
                Some(message) => message.to_string(),
                None => error.code.to_string(),
            };
            parts.push(format!("{field}: {message}"));
        }
    }
    parts.join("; ")
}
