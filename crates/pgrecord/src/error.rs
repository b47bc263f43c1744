//! Error types for pgrecord

use thiserror::Error;

/// Result type alias for pgrecord operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for database operations
#[derive(Debug, Error)]
pub enum OrmError {
    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error
    #[error("Query error: {0}")]
    Query(#[from] tokio_postgres::Error),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Unique constraint violation: {0}")]
    UniqueViolation(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check constraint violation
    #[error("Check constraint violation: {0}")]
    CheckViolation(String),

    /// A query returned a different number of rows than the operation allows
    #[error("Cardinality error: expected {expected} row(s), got {got}")]
    Cardinality { expected: usize, got: usize },

    /// A result column has no destination field
    #[error("Mapping error: column '{column}' has no field in {record}")]
    Mapping {
        column: String,
        record: &'static str,
    },

    /// Row decode error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Input or destination does not have the shape the operation needs
    #[error("Shape error: {0}")]
    Shape(String),

    /// Template references a parameter that was not bound
    #[error("Missing template parameter: {0}")]
    MissingParam(String),

    /// Template token kind does not match the bound parameter
    #[error("Parameter '{name}' is used as {expected} but bound as {found}")]
    ParamKind {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Audit columns were requested but no actor is set on the accessor
    #[error("Audit columns requested but no actor id is set")]
    MissingActor,

    /// Transaction begin/commit failure
    #[error("Transaction {stage} failed: {source}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pool error
    #[error("Pool error: {0}")]
    Pool(String),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a shape error
    pub fn shape(message: impl Into<String>) -> Self {
        Self::Shape(message.into())
    }

    /// Create a cardinality error
    pub fn cardinality(expected: usize, got: usize) -> Self {
        Self::Cardinality { expected, got }
    }

    /// Create a mapping error for a column the destination record does not declare
    pub fn unmapped(column: impl Into<String>, record: &'static str) -> Self {
        Self::Mapping {
            column: column.into(),
            record,
        }
    }

    /// Check if this is a unique violation error
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a cardinality error
    pub fn is_cardinality(&self) -> bool {
        matches!(self, Self::Cardinality { .. })
    }

    /// Parse a tokio_postgres error into a more specific OrmError
    pub fn from_db_error(err: tokio_postgres::Error) -> Self {
        if let Some(db_err) = err.as_db_error() {
            let constraint = db_err.constraint().unwrap_or("unknown");
            let message = db_err.message();

            match db_err.code().code() {
                "23505" => return Self::UniqueViolation(format!("{}: {}", constraint, message)),
                "23503" => {
                    return Self::ForeignKeyViolation(format!("{}: {}", constraint, message));
                }
                "23514" => return Self::CheckViolation(format!("{}: {}", constraint, message)),
                _ => {}
            }
        }
        Self::Query(err)
    }

    /// Wrap an error raised while beginning or finishing a transaction,
    /// including failure to check out its connection.
    pub(crate) fn transaction(
        stage: &'static str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Transaction {
            stage,
            source: source.into(),
        }
    }
}

impl From<deadpool_postgres::PoolError> for OrmError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}
