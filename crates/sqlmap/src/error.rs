//! Error types for sqlmap

use thiserror::Error;

/// Result type alias for sqlmap operations
pub type MapperResult<T> = Result<T, MapperError>;

/// Error types for template rendering, binding and statement execution
#[derive(Debug, Error)]
pub enum MapperError {
    /// Malformed template, invalid placeholder attributes, missing default constructor
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Placeholder or expression references a property that cannot be resolved
    #[error("Binding error: {0}")]
    Binding(String),

    /// An accessor that was resolved as ambiguous has been invoked
    #[error("Ambiguous accessor: {0}")]
    AmbiguousAccessor(String),

    /// Missing getter/setter, unknown statement id, or no rows
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend rejected prepare/bind/execute
    #[error("Execution error: {message}")]
    Execution {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Statement timeout enforced by the backend
    #[error("Statement timeout after {0:?}")]
    Timeout(std::time::Duration),

    /// Releasing a statement handle or connection failed
    #[error("Resource error: {0}")]
    Resource(String),

    /// A single-row operation returned more rows than expected
    #[error("Too many rows: expected {expected}, got {got}")]
    TooManyRows { expected: usize, got: usize },

    /// Other errors
    #[error("{0}")]
    Other(String),
}

impl MapperError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a binding error
    pub fn binding(message: impl Into<String>) -> Self {
        Self::Binding(message.into())
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create an execution error without an underlying source
    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution {
            message: message.into(),
            source: None,
        }
    }

    /// Create an execution error wrapping a backend error
    pub fn execution_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Execution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a resource error
    pub fn resource(message: impl Into<String>) -> Self {
        Self::Resource(message.into())
    }

    /// Create a too many rows error
    pub fn too_many_rows(expected: usize, got: usize) -> Self {
        Self::TooManyRows { expected, got }
    }

    /// Check if this is a configuration error
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is a binding error (including ambiguous accessor invocations)
    pub fn is_binding(&self) -> bool {
        matches!(self, Self::Binding(_) | Self::AmbiguousAccessor(_))
    }

    /// Check if this is an ambiguous accessor error
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousAccessor(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is an execution error
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this is a resource release error
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource(_))
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for MapperError {
    fn from(err: tokio_postgres::Error) -> Self {
        let message = match err.as_db_error() {
            Some(db_err) => format!("{} ({})", db_err.message(), db_err.code().code()),
            None => err.to_string(),
        };
        Self::execution_with(message, err)
    }
}

impl From<toml::de::Error> for MapperError {
    fn from(err: toml::de::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
