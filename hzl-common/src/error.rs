//! Common error types for the HZL compiler

use thiserror::Error;

/// Common result type for HZL operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds surfaced by every compilation stage
///
/// All errors are terminal for the current compilation. There is no partial
/// output and no retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid definition shape: conflicting declarations, missing required
    /// fields, wrong source count, reference cycles
    #[error("Configuration error: {0}")]
    Config(String),

    /// Numeric parameter outside its fixed allowed range
    #[error("Parameter '{name}' with value {value} is out of allowed range [{low}, {high}]")]
    OutOfRange {
        name: String,
        value: f64,
        low: f64,
        high: f64,
    },

    /// Expression could not be parsed or evaluated to a finite number
    #[error("Failed to evaluate expression '{expression}' with harmonic_index={harmonic_index}: {cause}")]
    Expression {
        expression: String,
        harmonic_index: u32,
        cause: String,
    },

    /// Transformation type is missing or not implemented
    #[error("Transformation type not supported: {0}")]
    UnsupportedTransformation(String),

    /// Referenced definition could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// Definition document could not be decoded or encoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any of the above, tagged with the definition or element it came from
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the identifier of the source being processed
    pub fn context(self, context: impl Into<String>) -> Self {
        Error::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, with every `Context` layer peeled off
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attach source identifiers to fallible results
pub trait ResultExt<T> {
    /// Wrap the error (if any) with a fixed context string
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Wrap the error (if any) with a lazily built context string
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}
