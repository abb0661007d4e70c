//! Error types for the permission-boundary pipeline
//!
//! Errors are structured with fields to aid diagnosis without re-running.
//! Each variant carries the qualifier, resource name or index involved.
//! Nothing in the pipeline retries: generation is deterministic for a given
//! qualifier and toolkit version, so every error aborts the run.

use thiserror::Error;

/// Main error type for pipeline operations
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing configuration input
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's invalid
        message: String,
        /// The offending setting (e.g., "CDK_DEFAULT_ACCOUNT")
        field: Option<String>,
    },

    /// The provisioning toolkit failed to produce a template
    #[error("template generation failed for qualifier {qualifier}: {message}")]
    Generation {
        /// Qualifier the template was requested for
        qualifier: String,
        /// Description of what failed
        message: String,
    },

    /// The template does not have the shape the rewriter expects
    #[error("template shape mismatch at {resource}: {message}")]
    ShapeMismatch {
        /// Logical id of the resource being rewritten
        resource: String,
        /// Description of the mismatch
        message: String,
        /// Statement index involved, if any
        index: Option<usize>,
    },

    /// Temporary artifact or file I/O failure
    #[error("io error [{context}]: {source}")]
    Io {
        /// What was being read or written
        context: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
        /// The document kind being serialized (if known)
        kind: Option<String>,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            field: None,
        }
    }

    /// Create a configuration error naming the offending setting
    pub fn configuration_for_field(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
            field: Some(field.into()),
        }
    }

    /// Create a generation error for a qualifier
    pub fn generation(qualifier: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Generation {
            qualifier: qualifier.into(),
            message: msg.into(),
        }
    }

    /// Create a shape mismatch error for a resource
    pub fn shape_mismatch(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            resource: resource.into(),
            message: msg.into(),
            index: None,
        }
    }

    /// Create a shape mismatch error pointing at a statement index
    pub fn shape_mismatch_at(
        resource: impl Into<String>,
        index: usize,
        msg: impl Into<String>,
    ) -> Self {
        Self::ShapeMismatch {
            resource: resource.into(),
            message: msg.into(),
            index: Some(index),
        }
    }

    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a serialization error with document kind context
    pub fn serialization_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Get the resource logical id if this error is tied to one
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::ShapeMismatch { resource, .. } => Some(resource),
            _ => None,
        }
    }

    /// Get the qualifier if this error is tied to one
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            Error::Generation { qualifier, .. } => Some(qualifier),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_mismatch_carries_resource_and_index() {
        let err = Error::shape_mismatch_at("LookupRole", 3, "statement missing");
        assert_eq!(err.resource(), Some("LookupRole"));
        match err {
            Error::ShapeMismatch { index, .. } => assert_eq!(index, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn generation_error_mentions_qualifier() {
        let err = Error::generation("35e2023292", "cdk exited with status 1");
        assert_eq!(err.qualifier(), Some("35e2023292"));
        assert!(err.to_string().contains("35e2023292"));
        assert!(err.to_string().contains("status 1"));
    }

    #[test]
    fn configuration_error_records_field() {
        let err = Error::configuration_for_field("CDK_DEFAULT_ACCOUNT", "must be 12 digits");
        match &err {
            Error::Configuration { field, .. } => {
                assert_eq!(field.as_deref(), Some("CDK_DEFAULT_ACCOUNT"))
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.resource().is_none());
        assert!(err.qualifier().is_none());
    }

    #[test]
    fn io_error_keeps_source() {
        let err = Error::io(
            "write bootstrap template",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("write bootstrap template"));
    }
}
