//! Error types for Mimic operations

use crate::transcript::RecordedException;

/// Result type for Mimic operations
pub type Result<T> = std::result::Result<T, MimicError>;

/// Error types for the Mimic replay core
#[derive(Debug, thiserror::Error)]
pub enum MimicError {
    /// The call at the cursor has a different method name
    #[error("Sequence mismatch{}: expected {expected} but got {actual}", at(.location))]
    SequenceMismatch {
        expected: String,
        actual: String,
        location: Option<String>,
    },

    /// A value was requested but the expected sequence is exhausted
    #[error("No calls remain{} for '{method}'", at(.location))]
    NoCallsRemain {
        method: String,
        location: Option<String>,
    },

    /// The expected record has no result but a value was requested
    #[error(
        "Missing return value{} for '{method}': fill in the Returns line of the transcript",
        at(.location)
    )]
    MissingReturnValue {
        method: String,
        location: Option<String>,
    },

    /// An `<unknown>` placeholder was decoded
    #[error(
        "Unknown object{}: register the object before recording so it can be referenced by id",
        .type_name.as_deref().map(|t| format!(" of type {}", t)).unwrap_or_default()
    )]
    UnknownObject { type_name: Option<String> },

    /// A reference could not be resolved
    #[error(transparent)]
    ObjectNotFound(#[from] ObjectNotFound),

    /// Well-formed text that does not fit the requested type
    #[error("Cannot convert '{text}' to {expected}: {reason}")]
    TypeConversion {
        text: String,
        expected: String,
        reason: String,
    },

    /// Unbalanced delimiters, missing separators or unknown lines
    #[error("Malformed grammar in '{text}': {reason}")]
    MalformedGrammar { text: String, reason: String },

    /// A recorded exception being raised again during replay
    #[error("Replayed exception {0}")]
    Replayed(RecordedException),

    /// Expected calls were never made
    #[error("{} expected call(s) were not made:\n{}", .remaining.len(), .remaining.join("\n"))]
    UnconsumedCalls { remaining: Vec<String> },

    /// An explicit id is already bound to another object
    #[error("Id '{id}' is already registered to a different object")]
    DuplicateId { id: String },

    /// A declared test input has neither a preamble value nor a default
    #[error("Test input '{name}' is missing and has no default")]
    MissingInput { name: String },

    /// A result was reported while no passthrough call was pending
    #[error("No recorded call is waiting for a result (last method: {method})")]
    NotRecording { method: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// The two ways resolving `<id:X>` can fail
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectNotFound {
    /// The registry is present but has no such id
    #[error("Object with id '{0}' not found in registry")]
    NotFound(String),

    /// No registry was supplied at all
    #[error("Cannot resolve id '{0}': no object registry provided")]
    NoRegistry(String),
}

impl MimicError {
    pub(crate) fn type_conversion(
        text: impl Into<String>,
        expected: impl std::fmt::Display,
        reason: impl Into<String>,
    ) -> Self {
        MimicError::TypeConversion {
            text: text.into(),
            expected: expected.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        MimicError::MalformedGrammar {
            text: text.into(),
            reason: reason.into(),
        }
    }
}

fn at(location: &Option<String>) -> String {
    location
        .as_deref()
        .map(|path| format!(" in {}", path))
        .unwrap_or_default()
}
