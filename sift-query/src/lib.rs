//! # sift-query
//!
//! Injection-resistant query construction and filter decoding.
//!
//! This crate provides:
//! - A fluent, single-use [`QueryBuilder`] that splices only validated
//!   identifiers and fixed operator tokens into query text and routes every
//!   value through positional parameters
//! - A decoder for untrusted `field|CONDITION|value` filter tokens
//! - Identifier validation and free-text sanitization
//! - Hydration of partial projections through per-entity field tables
//!
//! ## Building queries
//!
//! ```rust,ignore
//! use sift_query::{Condition, Dao};
//!
//! let dao = Dao::new(engine);
//! let ativos: Vec<Produto> = dao
//!     .select()
//!     .from::<Produto>()?
//!     .r#where("ativo", Condition::Equal, [true])?
//!     .order_by("nome", true)?
//!     .list()
//!     .await?;
//! ```
//!
//! ## Decoding filters
//!
//! ```rust
//! use sift_query::{FilterQuery, PredicateSet};
//!
//! let mut query = FilterQuery::new(["preco|LESS_THAN|100", "nome|EQUAL|1 OR 1=1"]);
//! query.allow_only(["preco", "nome"]);
//!
//! let mut predicates = PredicateSet::new();
//! query.apply_to(&mut predicates);
//! assert_eq!(predicates.len(), 1);
//! ```
//!
//! ## Failure contract
//!
//! Untrusted input (filter tokens, sanitizer input) fails open by omission:
//! offending items are dropped and logged at `debug`. Programmer input
//! (builder arguments) fails loud with a [`QueryError`]. Zero-row lookups
//! fail with one of the two not-found codes.
//!
//! ```rust
//! use sift_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found_by_id("Produto", 7i64);
//! assert_eq!(err.code, ErrorCode::RecordNotFoundById);
//! assert!(err.is_not_found());
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod dao;
pub mod decode;
pub mod error;
pub mod filter;
pub mod logging;
pub mod schema;
pub mod security;
pub mod traits;
pub mod types;

pub use builder::QueryBuilder;
pub use condition::{Arity, Condition, UnknownCondition};
pub use config::{ConfigError, DebugConfig, SanitizerConfig, SiftConfig};
pub use dao::Dao;
pub use decode::{FilterItem, FilterQuery};
pub use error::{ErrorCode, ErrorContext, IntoQueryError, QueryError, QueryResult};
pub use filter::{FilterValue, FromValue, Predicate, PredicateSet, ValueError};
pub use schema::{EntitySchema, SchemaBuilder, Setter};
pub use security::{Sanitizer, safe_field, safe_value};
pub use traits::{BoundQuery, BoxFuture, Entity, QueryEngine};
pub use types::{OrderItem, OrderSpec, SortOrder};

// Re-export logging utilities
pub use logging::{QueryLogger, get_log_format, get_log_level, init as init_logging, is_debug_enabled};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::builder::QueryBuilder;
    pub use crate::condition::Condition;
    pub use crate::dao::Dao;
    pub use crate::decode::{FilterItem, FilterQuery};
    pub use crate::entity_schema;
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::filter::{FilterValue, PredicateSet};
    pub use crate::schema::EntitySchema;
    pub use crate::traits::{Entity, QueryEngine};
    pub use crate::types::{OrderSpec, SortOrder};
}
