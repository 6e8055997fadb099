//! Error types for the flytta library.
//!
//! Every failure a batch can surface is a deterministic structural condition
//! in the input program: nothing here models transient faults, and nothing is
//! retried. Errors carry the scope, member, and location needed for caller
//! diagnosis.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::syntax::tree::NodeId;

/// Main result type for flytta operations.
pub type Result<T> = std::result::Result<T, FlyttaError>;

/// Comprehensive error type for all flytta operations.
#[derive(Error, Debug)]
pub enum FlyttaError {
    /// A named scope or member does not exist in the loaded program
    #[error("not found: {member} in scope '{scope}'")]
    NotFound {
        /// Scope that was searched
        scope: String,
        /// Member (or scope) name that was missing
        member: String,
    },

    /// An incompatible same-named member already exists in the target scope
    #[error("name collision: '{member}' already exists in target scope '{scope}' as {existing_kind}")]
    NameCollision {
        /// Target scope holding the conflicting member
        scope: String,
        /// Conflicting member name
        member: String,
        /// Kind of the pre-existing member
        existing_kind: String,
    },

    /// The member selected for a move is itself a delegating stub left by a
    /// prior move in this session; the caller must inline it first
    #[error("already moved: '{scope}.{member}' is a delegating stub forwarding to '{moved_to}'")]
    AlreadyMoved {
        /// Scope still holding the stub
        scope: String,
        /// Stub member name
        member: String,
        /// Destination the stub forwards to
        moved_to: String,
    },

    /// A requested field anchor exists in the target but has the wrong type
    #[error("type mismatch: anchor field '{member}' in '{scope}' has type '{actual}', expected '{expected}'")]
    TypeMismatch {
        /// Target scope holding the field
        scope: String,
        /// Anchor field name
        member: String,
        /// Type the anchor must have (the source scope)
        expected: String,
        /// Declared type of the existing field
        actual: String,
    },

    /// A resolved reference occupies a position with no rewrite rule.
    /// Rewriting must refuse loudly here rather than guess; a silent
    /// miscompile is never acceptable.
    #[error("unsupported reference shape in '{scope}.{member}': {message}")]
    UnsupportedReferenceShape {
        /// Scope containing the offending reference
        scope: String,
        /// Member containing the offending reference
        member: String,
        /// Tree node at the offending position
        node: NodeId,
        /// What made the position unrewritable
        message: String,
    },

    /// The destination path for a materialized unit cannot be written
    #[error("target unwritable: {path}")]
    TargetUnwritable {
        /// Offending destination path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// I/O related errors (file operations, etc.)
    #[error("I/O error: {message}")]
    Io {
        /// Human-readable error message
        message: String,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Config {
        /// Error description
        message: String,
        /// Configuration field that caused the error
        field: Option<String>,
    },

    /// Serialization/deserialization errors
    #[error("serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
        /// Data type being serialized
        data_type: Option<String>,
        /// Underlying serialization error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors for input data
    #[error("validation error: {message}")]
    Validation {
        /// Error description
        message: String,
        /// Field or input that failed validation
        field: Option<String>,
    },

    /// Generic internal errors
    #[error("internal error: {message}")]
    Internal {
        /// Error description
        message: String,
        /// Additional context
        context: Option<String>,
    },
}

impl FlyttaError {
    /// Create a new not-found error
    pub fn not_found(scope: impl Into<String>, member: impl Into<String>) -> Self {
        Self::NotFound {
            scope: scope.into(),
            member: member.into(),
        }
    }

    /// Create a new name-collision error
    pub fn name_collision(
        scope: impl Into<String>,
        member: impl Into<String>,
        existing_kind: impl Into<String>,
    ) -> Self {
        Self::NameCollision {
            scope: scope.into(),
            member: member.into(),
            existing_kind: existing_kind.into(),
        }
    }

    /// Create a new already-moved error naming the prior destination
    pub fn already_moved(
        scope: impl Into<String>,
        member: impl Into<String>,
        moved_to: impl Into<String>,
    ) -> Self {
        Self::AlreadyMoved {
            scope: scope.into(),
            member: member.into(),
            moved_to: moved_to.into(),
        }
    }

    /// Create a new anchor type-mismatch error
    pub fn type_mismatch(
        scope: impl Into<String>,
        member: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            scope: scope.into(),
            member: member.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a new unsupported-reference-shape error with the offending node
    pub fn unsupported_shape(
        scope: impl Into<String>,
        member: impl Into<String>,
        node: NodeId,
        message: impl Into<String>,
    ) -> Self {
        Self::UnsupportedReferenceShape {
            scope: scope.into(),
            member: member.into(),
            node,
            message: message.into(),
        }
    }

    /// Create a new target-unwritable error
    pub fn target_unwritable(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::TargetUnwritable {
            path: path.into(),
            source,
        }
    }

    /// Create a new I/O error with context
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new configuration error with field context
    pub fn config_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a new validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a new internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            context: None,
        }
    }

    /// Add context to an existing error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        if let Self::Internal { context: ctx, .. } = &mut self {
            *ctx = Some(context.into());
        }
        self
    }
}

// Implement From traits for common error types
impl From<io::Error> for FlyttaError {
    fn from(err: io::Error) -> Self {
        Self::io("I/O operation failed", err)
    }
}

impl From<serde_json::Error> for FlyttaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: format!("JSON serialization failed: {err}"),
            data_type: Some("JSON".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_yaml::Error> for FlyttaError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: format!("YAML serialization failed: {err}"),
            data_type: Some("YAML".to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// Result extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;

    /// Add static context to an error result
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<FlyttaError>,
{
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }

    fn context(self, msg: &'static str) -> Result<T> {
        self.map_err(|e| e.into().with_context(msg))
    }
}
