//! Entry point that hands out builders and delegates writes.

use tracing::debug;

use crate::builder::QueryBuilder;
use crate::config::SiftConfig;
use crate::decode::FilterQuery;
use crate::error::QueryResult;
use crate::logging::QueryLogger;
use crate::security::Sanitizer;
use crate::traits::{Entity, QueryEngine};

/// Data access object over a [`QueryEngine`].
///
/// Every `select` call returns a fresh [`QueryBuilder`]; builders are never
/// shared between queries.
///
/// # Example
///
/// ```rust,ignore
/// let dao = Dao::new(engine);
/// let venda: Venda = dao.select().from::<Venda>()?.id(42i64).await?;
/// ```
#[derive(Debug, Clone)]
pub struct Dao<E: QueryEngine> {
    engine: E,
    sanitizer: Sanitizer,
    logger: QueryLogger,
}

impl<E: QueryEngine> Dao<E> {
    /// Wrap an engine with default settings.
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            sanitizer: Sanitizer::default(),
            logger: QueryLogger::from_env(),
        }
    }

    /// Wrap an engine with settings from a loaded configuration.
    pub fn with_config(engine: E, config: &SiftConfig) -> Self {
        Self {
            engine,
            sanitizer: config.sanitizer.build(),
            logger: config.debug.query_logger(),
        }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The sanitizer used for filter tokens.
    pub fn sanitizer(&self) -> Sanitizer {
        self.sanitizer
    }

    /// Start a query selecting the whole entity.
    pub fn select(&self) -> QueryBuilder<'_, E> {
        QueryBuilder::new(&self.engine).with_logger(self.logger)
    }

    /// Start a query selecting only the listed fields.
    pub fn select_fields<I, S>(&self, fields: I) -> QueryResult<QueryBuilder<'_, E>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.select().select_fields(fields)
    }

    /// Decode raw filter tokens with this DAO's sanitizer.
    pub fn filters<I, S>(&self, tokens: I) -> FilterQuery
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        FilterQuery::new(tokens).with_sanitizer(self.sanitizer)
    }

    /// Persist a new entity.
    pub async fn insert<T: Entity>(&self, entity: T) -> QueryResult<T> {
        debug!(entity = T::ENTITY_NAME, "Inserting entity");
        self.engine.insert(entity).await
    }

    /// Merge an entity's state into the store.
    pub async fn update<T: Entity>(&self, entity: T) -> QueryResult<T> {
        debug!(entity = T::ENTITY_NAME, "Updating entity");
        self.engine.update(entity).await
    }

    /// Remove an entity.
    pub async fn delete<T: Entity>(&self, entity: T) -> QueryResult<()> {
        debug!(entity = T::ENTITY_NAME, "Deleting entity");
        self.engine.delete(entity).await
    }
}
