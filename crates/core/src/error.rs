//! Error types for Trellis.

use crate::types::Type;
use thiserror::Error;

/// Result type alias for Trellis operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised while building or evaluating queries.
#[derive(Debug, Error)]
pub enum Error {
    /// A value or operation does not fit the type declared for its position.
    /// Raised eagerly while graphs, tuples and operations are constructed.
    #[error("Type mismatch in {context}: expected {expected}, got {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    /// Malformed operation configuration.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// An operation could not complete for some item.
    #[error("Operation failed: {message}")]
    Operation { message: String },

    /// Evaluation recursed deeper than the configured bound.
    #[error("Evaluation exceeded the maximum depth of {limit} frames")]
    DepthExceeded { limit: usize },

    /// An inner error annotated with the place it propagated through.
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(context: impl Into<String>, expected: Type, found: Type) -> Self {
        Error::TypeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Error::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an operation error.
    pub fn operation(message: impl Into<String>) -> Self {
        Error::Operation {
            message: message.into(),
        }
    }

    /// Creates a depth exceeded error.
    pub fn depth_exceeded(limit: usize) -> Self {
        Error::DepthExceeded { limit }
    }

    /// Wraps this error with one more level of context.
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping all context layers.
    pub fn root_cause(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = &**source;
        }
        current
    }

    /// Returns the context messages from the outermost to the innermost.
    pub fn trail(&self) -> Vec<&str> {
        let mut trail = Vec::new();
        let mut current = self;
        while let Error::Context { context, source } = current {
            trail.push(context.as_str());
            current = &**source;
        }
        trail
    }

    /// Returns true if the root cause is a schema-level type mismatch.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self.root_cause(), Error::TypeMismatch { .. })
    }

    /// Renders the whole chain on one line, outermost first.
    pub fn report(&self) -> String {
        let mut parts: Vec<String> = self.trail().into_iter().map(String::from).collect();
        parts.push(self.root_cause().to_string());
        parts.join(": ")
    }
}
