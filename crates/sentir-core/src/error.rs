//! Error types for sentir.
//!
//! Errors are data: every variant carries an HTTP-style status and can be
//! turned into an `error` [`Record`] that renders through the same
//! serializer as a successful response.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;

use crate::models;
use crate::record::Record;

/// Result type alias using sentir's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// One offending field inside a validation failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Parameter name or JSON pointer of the offending value.
    pub field: String,
    /// Human readable reason.
    pub reason: String,
    /// The specification that was violated, when one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<JsonValue>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
            spec: None,
        }
    }

    pub fn with_spec(mut self, spec: JsonValue) -> Self {
        self.spec = Some(spec);
        self
    }
}

/// Core error type for sentir operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad, missing or unrecognized parameters or fields. Always carries
    /// every offending field, never just the first.
    #[error("{message}: {}", field_names(.errors))]
    Validation {
        message: String,
        errors: Vec<FieldError>,
        parameters: Option<Map<String, JsonValue>>,
    },

    /// Named plugin is not registered
    #[error("Plugin not found: {0}")]
    PluginNotFound(String),

    /// No plugin was named and no default plugin is active
    #[error("No valid algorithm")]
    NoValidAlgorithm,

    /// Plugin exists but has not been activated
    #[error("Plugin not activated: {0}")]
    NotActivated(String),

    /// Failure declared by a plugin during analysis
    #[error("{message}")]
    PluginExecution { status: u16, message: String },

    /// Unexpected failure; the message never carries internal detail
    #[error("Internal error: {0}")]
    Internal(String),

    /// Load-time configuration problem (duplicate plugin, malformed schema)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Plugin descriptor is missing identity fields or is malformed
    #[error("Invalid plugin descriptor: {0}")]
    InvalidDescriptor(String),

    /// Plugin call exceeded its deadline
    #[error("Plugin '{plugin}' timed out after {after_ms}ms")]
    Timeout { plugin: String, after_ms: u64 },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn field_names(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.field.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl Error {
    /// Shortcut for plugin authors raising a typed failure.
    pub fn plugin(status: u16, message: impl Into<String>) -> Self {
        Error::PluginExecution {
            status,
            message: message.into(),
        }
    }

    /// Validation failure with the standard parameter message.
    pub fn invalid_params(
        errors: Vec<FieldError>,
        parameters: Option<Map<String, JsonValue>>,
    ) -> Self {
        Error::Validation {
            message: "Missing or invalid parameters".to_string(),
            errors,
            parameters,
        }
    }

    /// Status code propagated to the transport.
    pub fn status(&self) -> u16 {
        match self {
            Error::Validation { .. } => 404,
            Error::PluginNotFound(_) => 404,
            Error::NoValidAlgorithm => 500,
            Error::NotActivated(_) => 400,
            Error::PluginExecution { status, .. } => *status,
            Error::Internal(_) => 500,
            Error::Configuration(_) => 500,
            Error::InvalidDescriptor(_) => 500,
            Error::Timeout { .. } => 504,
            Error::Serialization(_) => 400,
            Error::Io(_) => 500,
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation_error",
            Error::PluginNotFound(_) => "plugin_not_found",
            Error::NoValidAlgorithm => "no_valid_algorithm",
            Error::NotActivated(_) => "not_activated",
            Error::PluginExecution { .. } => "plugin_error",
            Error::Internal(_) => "internal_error",
            Error::Configuration(_) => "configuration_error",
            Error::InvalidDescriptor(_) => "invalid_descriptor",
            Error::Timeout { .. } => "timeout",
            Error::Serialization(_) => "serialization_error",
            Error::Io(_) => "io_error",
        }
    }

    /// User-visible message.
    ///
    /// Validation and plugin errors report their own message; I/O errors are
    /// collapsed so file paths never reach a caller.
    pub fn message(&self) -> String {
        match self {
            Error::Validation { message, .. } => message.clone(),
            Error::PluginExecution { message, .. } => message.clone(),
            Error::Io(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }

    /// Errors a plugin raises on purpose. The orchestrator passes these
    /// through unchanged; everything else becomes [`Error::Internal`].
    pub fn is_declared(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. }
                | Error::PluginExecution { .. }
                | Error::PluginNotFound(_)
                | Error::NotActivated(_)
                | Error::NoValidAlgorithm
                | Error::Timeout { .. }
        )
    }

    /// Builds the `error` record for this failure.
    pub fn to_record(&self) -> Record {
        let mut record = models::error_record(self.status(), self.message());
        record.set("kind", self.kind());
        if let Error::Validation {
            errors, parameters, ..
        } = self
        {
            if let Ok(errors) = serde_json::to_value(errors) {
                record.set("errors", errors);
            }
            if let Some(parameters) = parameters {
                record.set("parameters", JsonValue::Object(parameters.clone()));
            }
        }
        record
    }

    /// Rebuilds an error from an `error` record.
    ///
    /// Validation errors come back with their field list; every other kind
    /// is returned as a [`Error::PluginExecution`] carrying the original
    /// status and message.
    pub fn from_record(record: &Record) -> Result<Self> {
        let status = record
            .get_u64("status")
            .and_then(|s| u16::try_from(s).ok())
            .ok_or_else(|| Error::Serialization("error record without status".into()))?;
        let message = record
            .get_str("message")
            .ok_or_else(|| Error::Serialization("error record without message".into()))?
            .to_string();

        if record.get_str("kind") == Some("validation_error") {
            let errors = match record.get("errors") {
                Some(field) => serde_json::from_value(field.to_value())?,
                None => Vec::new(),
            };
            let parameters = record
                .get("parameters")
                .and_then(|f| f.to_value().as_object().cloned());
            return Ok(Error::Validation {
                message,
                errors,
                parameters,
            });
        }

        Ok(Error::PluginExecution { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_kinds() -> Vec<Error> {
        vec![
            Error::invalid_params(vec![FieldError::new("input", "missing")], None),
            Error::PluginNotFound("nope".into()),
            Error::NoValidAlgorithm,
            Error::NotActivated("split".into()),
            Error::plugin(418, "teapot"),
            Error::Internal("Plugin 'x' failed".into()),
            Error::Configuration("duplicate plugin".into()),
            Error::InvalidDescriptor("missing version".into()),
            Error::Timeout {
                plugin: "slow".into(),
                after_ms: 10,
            },
            Error::Serialization("bad json".into()),
            Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "/secret/path")),
        ]
    }

    #[test]
    fn test_error_display_no_valid_algorithm() {
        assert_eq!(Error::NoValidAlgorithm.to_string(), "No valid algorithm");
        assert_eq!(Error::NoValidAlgorithm.status(), 500);
    }

    #[test]
    fn test_error_display_validation_lists_fields() {
        let err = Error::invalid_params(
            vec![
                FieldError::new("input", "missing"),
                FieldError::new("language", "missing"),
            ],
            None,
        );
        assert_eq!(
            err.to_string(),
            "Missing or invalid parameters: input, language"
        );
        assert_eq!(err.status(), 404);
    }

    #[test]
    fn test_error_status_table() {
        assert_eq!(Error::PluginNotFound("a".into()).status(), 404);
        assert_eq!(Error::NotActivated("a".into()).status(), 400);
        assert_eq!(Error::plugin(403, "no").status(), 403);
        assert_eq!(Error::Internal("x".into()).status(), 500);
        assert_eq!(
            Error::Timeout {
                plugin: "a".into(),
                after_ms: 1
            }
            .status(),
            504
        );
    }

    #[test]
    fn test_io_message_is_sanitized() {
        let err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "/secret/path",
        ));
        assert!(!err.message().contains("secret"));
    }

    #[test]
    fn test_declared_errors() {
        assert!(Error::plugin(400, "bad").is_declared());
        assert!(Error::invalid_params(vec![], None).is_declared());
        assert!(!Error::Internal("x".into()).is_declared());
        assert!(!Error::Serialization("x".into()).is_declared());
    }

    #[test]
    fn test_every_kind_round_trips_through_a_record() {
        for err in all_kinds() {
            let record = err.to_record();
            let text = serde_json::to_string(&record.to_value()).unwrap();
            let value: JsonValue = serde_json::from_str(&text).unwrap();
            let parsed = Record::from_value(&value).unwrap();
            let back = Error::from_record(&parsed).unwrap();
            assert_eq!(back.status(), err.status(), "{}", err.kind());
            assert_eq!(back.message(), err.message(), "{}", err.kind());
        }
    }

    #[test]
    fn test_validation_record_keeps_field_list() {
        let err = Error::invalid_params(
            vec![FieldError::new("language", "missing").with_spec(serde_json::json!({"required": true}))],
            None,
        );
        let back = Error::from_record(&err.to_record()).unwrap();
        match back {
            Error::Validation { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "language");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_from_serde_json_error() {
        let err: Error = serde_json::from_str::<JsonValue>("{").unwrap_err().into();
        assert_eq!(err.kind(), "serialization_error");
        assert_eq!(err.status(), 400);
    }
}
