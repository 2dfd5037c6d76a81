//! Seams to the persistence layer and to entity metadata.

use std::fmt;

pub use futures::future::BoxFuture;

use crate::error::QueryResult;
use crate::filter::FilterValue;
use crate::schema::EntitySchema;

/// A persisted entity type.
///
/// Entities are built with `Default` and filled field by field when a
/// partial projection is hydrated.
pub trait Entity: Default + Send + Sync + 'static {
    /// The name used in `FROM` clauses and error messages.
    const ENTITY_NAME: &'static str;

    /// The entity's settable-by-name field table.
    fn schema() -> &'static EntitySchema<Self>;
}

/// Query text plus everything an engine needs to run it.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    /// Query text with `?1`, `?2`, ... placeholders.
    pub text: String,
    /// Root entity of the `FROM` clause.
    pub entity: String,
    /// Positional parameters; `params[0]` binds `?1`.
    pub params: Vec<FilterValue>,
    /// Row cap, if any.
    pub max_results: Option<u32>,
}

impl fmt::Display for BoundQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The persistence collaborator.
///
/// Implementations own connection handling and transactions. Errors raised
/// by the store should come back as [`QueryError`](crate::QueryError) with
/// `ErrorCode::DatabaseError` (see [`IntoQueryError`](crate::IntoQueryError)).
pub trait QueryEngine: Send + Sync {
    /// Run a full-entity query and materialize the rows as `T`.
    fn query_entities<T: Entity>(&self, query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<T>>>;

    /// Run a query and return its rows as positional values.
    fn query_rows(&self, query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<Vec<FilterValue>>>>;

    /// Look up an entity by primary key.
    fn find_by_id<T: Entity>(&self, id: FilterValue) -> BoxFuture<'_, QueryResult<Option<T>>>;

    /// Persist a new entity, returning the stored version.
    fn insert<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>>;

    /// Merge an entity's state into the store, returning the stored version.
    fn update<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>>;

    /// Remove an entity.
    fn delete<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<()>>;
}
