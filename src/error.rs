//! Error types for statement building, binding and execution.

use thiserror::Error;

/// Classification of a [`DmlError`], independent of any context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Statement has no SQL, no table or no columns.
    Empty,
    /// Malformed input such as a bad identifier or a wrong affected-row count.
    NotValid,
    /// A value has no serialization rule.
    NotSupported,
    /// Two lists that must have equal length disagree.
    Mismatch,
    /// Option combination that cannot be honoured.
    NotAllowed,
    /// A lookup or scalar load found nothing.
    NotFound,
    /// A numeric input outside its valid range.
    OutOfRange,
    /// Failure reported by the execution boundary.
    Execution,
    /// Configuration could not be read or parsed.
    Config,
    /// IO failure.
    Io,
    /// Several independent failures.
    Multiple,
}

/// The main error type.
#[derive(Debug, Error)]
pub enum DmlError {
    #[error("empty: {0}")]
    Empty(String),

    #[error("not valid: {0}")]
    NotValid(String),

    #[error("not supported: {0}")]
    NotSupported(String),

    #[error("mismatch: {0}")]
    Mismatch(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    /// Error from the database driver or a cancelled run.
    #[error("execution error: {0}")]
    Execution(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// An inner error with a description of what was being attempted.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<DmlError>,
    },

    /// Errors collected from parallel workers.
    #[error("{} errors occurred: {}", .0.len(), join_errors(.0))]
    Multi(Vec<DmlError>),
}

fn join_errors(errors: &[DmlError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl DmlError {
    pub fn empty(message: impl Into<String>) -> Self {
        Self::Empty(message.into())
    }

    pub fn not_valid(message: impl Into<String>) -> Self {
        Self::NotValid(message.into())
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::NotSupported(message.into())
    }

    pub fn mismatch(message: impl Into<String>) -> Self {
        Self::Mismatch(message.into())
    }

    pub fn not_allowed(message: impl Into<String>) -> Self {
        Self::NotAllowed(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn out_of_range(message: impl Into<String>) -> Self {
        Self::OutOfRange(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    /// Error returned by a [`ColumnMapper`](crate::ColumnMapper) that does not
    /// know the requested column.
    pub fn unknown_column(column: &str) -> Self {
        Self::NotFound(format!("column {column:?} is not mapped by the record"))
    }

    /// Wrap the error with a description of the failed operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Collapse a list of errors: `None` when empty, the error itself when
    /// alone, [`DmlError::Multi`] otherwise.
    pub fn combine(mut errors: Vec<DmlError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(Self::Multi(errors)),
        }
    }

    /// The taxonomy kind, looking through context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Empty(_) => ErrorKind::Empty,
            Self::NotValid(_) => ErrorKind::NotValid,
            Self::NotSupported(_) => ErrorKind::NotSupported,
            Self::Mismatch(_) => ErrorKind::Mismatch,
            Self::NotAllowed(_) => ErrorKind::NotAllowed,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::Execution(_) => ErrorKind::Execution,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
            Self::Context { source, .. } => source.kind(),
            Self::Multi(_) => ErrorKind::Multiple,
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }
}

/// Attach context to the error of a result.
pub trait ResultExt<T> {
    fn context_with<F, S>(self, f: F) -> DmlResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for DmlResult<T> {
    fn context_with<F, S>(self, f: F) -> DmlResult<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| e.context(f()))
    }
}

/// Result type alias for dml operations.
pub type DmlResult<T> = Result<T, DmlError>;
