use std::fmt::{Display, Formatter};

/// The kind of an error, independent of which component raised it.
///
/// Callers branch on the category to decide whether an operation is worth
/// retrying or whether the request itself has to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The host filesystem or mount subsystem misbehaved. Usually not the
    /// caller's fault.
    LocalCacheProblem,

    /// The request cannot be satisfied as specified, e.g. an unsupported
    /// source type or a ware id mismatch after unpacking.
    AssemblyInvalid,

    /// A path or entry that was assumed to exist does not.
    NotFound,

    /// The operation was cancelled before it completed.
    Cancelled,

    /// A remote warehouse could not provide the requested content.
    WarehouseUnavailable,

    /// Anything else.
    Other,
}

impl ErrorCategory {
    /// Returns true if retrying the same request at a higher layer may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorCategory::LocalCacheProblem | ErrorCategory::WarehouseUnavailable
        )
    }
}

impl Display for ErrorCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorCategory::LocalCacheProblem => "local cache problem",
            ErrorCategory::AssemblyInvalid => "assembly invalid",
            ErrorCategory::NotFound => "not found",
            ErrorCategory::Cancelled => "cancelled",
            ErrorCategory::WarehouseUnavailable => "warehouse unavailable",
            ErrorCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Implemented by every error in the ware crates so that its kind can be
/// queried programmatically.
pub trait Categorized {
    /// Returns the category of this error.
    fn category(&self) -> ErrorCategory;
}

/// A categorized error that crosses the boundary of a [`crate::UnpackTool`]
/// or [`crate::PackTool`].
#[derive(Debug)]
pub struct WareError {
    category: ErrorCategory,
    message: String,
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl WareError {
    /// Constructs a new error without an underlying cause.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wraps a categorized error, keeping its category and using it as the
    /// source of the returned error.
    pub fn wrap<E>(err: E) -> Self
    where
        E: Categorized + std::error::Error + Send + Sync + 'static,
    {
        Self {
            category: err.category(),
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Returns the message of this error, without its sources.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for WareError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WareError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|source| source as &(dyn std::error::Error + 'static))
    }
}

impl Categorized for WareError {
    fn category(&self) -> ErrorCategory {
        self.category
    }
}
