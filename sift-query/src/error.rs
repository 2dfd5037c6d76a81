//! Error types for query construction and execution.
//!
//! Errors carry a code for programmatic handling plus context about the
//! entity, field and query text involved.
//!
//! # Error Codes
//!
//! Error codes follow a pattern: P{category}{number}
//! - 1xxx: Lookup and builder misuse (not found, bad arity, bad identifier)
//! - 5xxx: Execution errors raised by the engine
//! - 6xxx: Data errors (hydration)
//! - 9xxx: Internal errors
//!
//! Untrusted input never produces a `QueryError`: the sanitizer and the
//! filter decoder drop offending items instead. Every error here is either a
//! lookup that matched nothing or a programming mistake at a call site.
//!
//! ```rust
//! use sift_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("Produto");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.is_not_found());
//!
//! let err = QueryError::not_found_by_id("Produto", 42);
//! assert_eq!(err.code, ErrorCode::RecordNotFoundById);
//! assert!(err.is_not_found());
//! ```

use std::fmt;
use thiserror::Error;

use crate::condition::Condition;
use crate::filter::FilterValue;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Lookup and builder errors (1xxx)
    /// Single-result fetch matched no rows (P1001).
    RecordNotFound = 1001,
    /// Identifier lookup matched no rows (P1002).
    RecordNotFoundById = 1002,
    /// Operand count does not match the condition's arity (P1003).
    InvalidArity = 1003,
    /// Row cap is not positive (P1004).
    InvalidLimit = 1004,
    /// Blank or malformed identifier handed to the builder (P1005).
    InvalidField = 1005,
    /// Builder operation called in the wrong state (P1006).
    InvalidState = 1006,

    // Execution errors (5xxx)
    /// Error raised by the underlying store (P5001).
    DatabaseError = 5001,

    // Data errors (6xxx)
    /// Row value could not be written into an entity field (P6001).
    Hydration = 6001,

    // Internal errors (9xxx)
    /// Internal error (P9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "P1001").
    pub fn code(&self) -> String {
        format!("P{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::RecordNotFoundById => "Record not found for identifier",
            Self::InvalidArity => "Wrong number of operands for condition",
            Self::InvalidLimit => "Invalid row limit",
            Self::InvalidField => "Invalid field identifier",
            Self::InvalidState => "Invalid builder state",
            Self::DatabaseError => "Database error",
            Self::Hydration => "Hydration error",
            Self::Internal => "Internal error",
        }
    }

    /// Whether this code marks builder misuse rather than a runtime outcome.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidArity | Self::InvalidLimit | Self::InvalidField | Self::InvalidState
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The entity involved.
    pub entity: Option<String>,
    /// The field involved.
    pub field: Option<String>,
    /// The identifier a lookup was keyed on.
    pub identifier: Option<FilterValue>,
    /// The query text (if available).
    pub query: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<String>,
}

/// Errors that can occur while building or executing a query.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(suggestion.into());
        self
    }

    /// Set the entity.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.context.entity = Some(entity.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the query text.
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.context.query = Some(query.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// Zero rows from a single-result fetch with no inferable identifier.
    pub fn not_found(entity: impl Into<String>) -> Self {
        let entity = entity.into();
        Self::new(ErrorCode::RecordNotFound, format!("{} not found", entity))
            .with_entity(&entity)
            .with_suggestion("Use list() when zero rows is an expected outcome")
    }

    /// Zero rows from an identifier-shaped lookup.
    pub fn not_found_by_id(entity: impl Into<String>, id: impl Into<FilterValue>) -> Self {
        let entity = entity.into();
        let id = id.into();
        let mut err = Self::new(
            ErrorCode::RecordNotFoundById,
            format!("{} not found for id {}", entity, id),
        )
        .with_entity(&entity);
        err.context.identifier = Some(id);
        err
    }

    /// Operand count does not match the condition.
    pub fn invalid_arity(field: impl Into<String>, condition: Condition, got: usize) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::InvalidArity,
            format!(
                "{} on `{}` requires {} operand(s), got {}",
                condition,
                field,
                condition.arity(),
                got
            ),
        )
        .with_field(&field)
    }

    /// Row cap is not positive.
    pub fn invalid_limit(limit: i64) -> Self {
        let message = if limit > 0 {
            format!("limit must be at most {}, got {}", u32::MAX, limit)
        } else {
            format!("limit must be greater than zero, got {}", limit)
        };
        Self::new(ErrorCode::InvalidLimit, message)
    }

    /// Blank or malformed identifier.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            ErrorCode::InvalidField,
            format!("invalid identifier `{}`: {}", field, message.into()),
        )
        .with_field(&field)
    }

    /// Operation called in the wrong builder state.
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidState, message.into())
    }

    /// A row value could not be written into an entity field.
    pub fn hydration(entity: impl Into<String>, field: impl Into<String>, message: impl Into<String>) -> Self {
        let entity = entity.into();
        let field = field.into();
        Self::new(
            ErrorCode::Hydration,
            format!("cannot set {}.{}: {}", entity, field, message.into()),
        )
        .with_entity(&entity)
        .with_field(&field)
    }

    /// Error raised by the underlying store.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Check if this is either of the not-found outcomes.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::RecordNotFound | ErrorCode::RecordNotFoundById
        )
    }

    /// Check if this error reports builder misuse.
    pub fn is_validation(&self) -> bool {
        self.code.is_validation()
    }

    /// The identifier carried by a `RecordNotFoundById` error.
    pub fn identifier(&self) -> Option<&FilterValue> {
        self.context.identifier.as_ref()
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref entity) = self.context.entity {
            output.push_str(&format!("  → Entity: {}\n", entity));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }
        if let Some(ref query) = self.context.query {
            let shown = if query.chars().count() > 200 {
                format!("{}...", query.chars().take(200).collect::<String>())
            } else {
                query.clone()
            };
            output.push_str(&format!("  → Query: {}\n", shown));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

/// Extension trait for wrapping store errors as [`QueryError`].
///
/// Engine implementations use this to hand driver errors back unchanged,
/// keeping the original as the error source.
pub trait IntoQueryError {
    /// Convert to a QueryError.
    fn into_query_error(self) -> QueryError;
}

impl<E: std::error::Error + Send + Sync + 'static> IntoQueryError for E {
    fn into_query_error(self) -> QueryError {
        QueryError::database(self.to_string()).with_source(self)
    }
}
