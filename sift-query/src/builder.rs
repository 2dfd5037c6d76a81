//! Single-use fluent query builder.
//!
//! The builder records structured state and renders text only in
//! [`QueryBuilder::build`]. Only identifiers that match the identifier
//! pattern and operator tokens from [`Condition`] are spliced into the text;
//! every value travels through the positional parameter list (`?1`, `?2`, ...).
//!
//! Misuse (blank or malformed identifiers, wrong operand counts, bad limits,
//! terminal operations in the wrong state) fails immediately with a
//! [`QueryError`].
//!
//! # Example
//!
//! ```rust,ignore
//! let produtos: Vec<Produto> = dao
//!     .select()
//!     .from::<Produto>()?
//!     .r#where("ativo", Condition::Equal, [true])?
//!     .r#where("estoque.quantidadeAtual", Condition::LessThan, [10])?
//!     .order_by("nome", true)?
//!     .limit(20)?
//!     .list()
//!     .await?;
//! ```

use std::any::TypeId;
use std::fmt;

use tracing::{debug, warn};

use crate::condition::Condition;
use crate::error::{QueryError, QueryResult};
use crate::filter::{FilterValue, PredicateSet};
use crate::logging::QueryLogger;
use crate::schema::last_segment;
use crate::security::is_identifier;
use crate::traits::{BoundQuery, Entity, QueryEngine};
use crate::types::{OrderSpec, SortOrder};

/// Alias used for the root entity unless `from_expr` names another.
pub const DEFAULT_ALIAS: &str = "c";

#[derive(Debug, Clone)]
struct Source {
    entity: String,
    alias: String,
    type_id: Option<TypeId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinKind {
    Inner,
    Left,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "JOIN",
            Self::Left => "LEFT JOIN",
        }
    }
}

#[derive(Debug, Clone)]
struct Join {
    kind: JoinKind,
    path: String,
    alias: String,
}

#[derive(Debug, Clone)]
struct Clause {
    field: String,
    condition: Condition,
    first_param: usize,
    operands: usize,
}

/// Builds and runs one query.
///
/// Created from a [`Dao`](crate::Dao) or with [`QueryBuilder::new`]. The
/// terminal operations (`list`, `one`, `id`, `list_rows`, `one_row`)
/// consume the builder.
pub struct QueryBuilder<'a, E: QueryEngine> {
    engine: &'a E,
    logger: QueryLogger,
    projection: Vec<String>,
    source: Option<Source>,
    joins: Vec<Join>,
    clauses: Vec<Clause>,
    params: Vec<FilterValue>,
    param_fields: Vec<String>,
    orders: Vec<(String, SortOrder)>,
    max_results: Option<u32>,
}

impl<'a, E: QueryEngine> QueryBuilder<'a, E> {
    /// Create an empty builder over `engine`, selecting the whole entity.
    pub fn new(engine: &'a E) -> Self {
        Self {
            engine,
            logger: QueryLogger::from_env(),
            projection: Vec::new(),
            source: None,
            joins: Vec::new(),
            clauses: Vec::new(),
            params: Vec::new(),
            param_fields: Vec::new(),
            orders: Vec::new(),
            max_results: None,
        }
    }

    /// Use these query log settings.
    pub fn with_logger(mut self, logger: QueryLogger) -> Self {
        self.logger = logger;
        self
    }

    fn reset(&mut self) {
        self.projection.clear();
        self.source = None;
        self.joins.clear();
        self.clauses.clear();
        self.params.clear();
        self.param_fields.clear();
        self.orders.clear();
        self.max_results = None;
    }

    // ============== Clauses ==============

    /// Start over, selecting the whole root entity.
    pub fn select(mut self) -> Self {
        self.reset();
        self
    }

    /// Start over, selecting only the listed fields.
    ///
    /// Blank entries are ignored; if nothing remains the whole entity is
    /// selected. Each field must be an identifier path.
    pub fn select_fields<I, S>(mut self, fields: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.reset();
        for field in fields {
            let field = field.as_ref().trim();
            if field.is_empty() {
                continue;
            }
            self.projection.push(identifier(field, "select")?);
        }
        Ok(self)
    }

    /// Select from entity `T`, aliased `c`.
    ///
    /// Projected fields that belong to the root alias are checked against
    /// `T`'s schema; unknown ones are logged, not rejected.
    pub fn from<T: Entity>(mut self) -> QueryResult<Self> {
        let entity = identifier(T::ENTITY_NAME, "from")?;
        let alias = DEFAULT_ALIAS.to_string();

        for raw in &self.projection {
            let field = match raw.split_once('.') {
                None => raw.as_str(),
                Some((head, rest)) if head == alias => rest,
                Some(_) => continue,
            };
            let name = last_segment(field);
            if !T::schema().has_field(name) {
                warn!(entity = %entity, field = %name, "Projected field does not exist on entity");
            }
        }

        self.source = Some(Source {
            entity,
            alias,
            type_id: Some(TypeId::of::<T>()),
        });
        Ok(self)
    }

    /// Select from an untyped `"Entity [alias]"` expression.
    ///
    /// The alias defaults to `c`. Projected fields cannot be checked.
    pub fn from_expr(mut self, expr: &str) -> QueryResult<Self> {
        let parts: Vec<&str> = expr.split_whitespace().collect();
        let (entity, alias) = match parts.as_slice() {
            [entity] => (*entity, DEFAULT_ALIAS),
            [entity, alias] => (*entity, *alias),
            _ => {
                return Err(QueryError::invalid_field(
                    expr,
                    "FROM expects `Entity` or `Entity alias`",
                ));
            }
        };

        if !self.projection.is_empty() {
            debug!(entity, "Cannot check projected fields without a typed source");
        }

        self.source = Some(Source {
            entity: identifier(entity, "from")?,
            alias: identifier(alias, "from")?,
            type_id: None,
        });
        Ok(self)
    }

    /// Inner join an association, aliased by its last path segment.
    pub fn join(self, path: &str) -> QueryResult<Self> {
        self.push_join(JoinKind::Inner, path, None)
    }

    /// Inner join an association under an explicit alias.
    pub fn join_as(self, path: &str, alias: &str) -> QueryResult<Self> {
        self.push_join(JoinKind::Inner, path, Some(alias))
    }

    /// Left join an association, aliased by its last path segment.
    pub fn left_join(self, path: &str) -> QueryResult<Self> {
        self.push_join(JoinKind::Left, path, None)
    }

    /// Left join an association under an explicit alias.
    pub fn left_join_as(self, path: &str, alias: &str) -> QueryResult<Self> {
        self.push_join(JoinKind::Left, path, Some(alias))
    }

    fn push_join(mut self, kind: JoinKind, path: &str, alias: Option<&str>) -> QueryResult<Self> {
        let path = identifier(path, "join")?;
        let alias = match alias.map(str::trim).filter(|a| !a.is_empty()) {
            Some(alias) => identifier(alias, "join")?,
            None => last_segment(&path).to_string(),
        };
        self.joins.push(Join { kind, path, alias });
        Ok(self)
    }

    /// Add a predicate, joined to earlier ones with `AND`.
    ///
    /// `BETWEEN` takes exactly two operands, `IN` any number (none renders
    /// an always-false predicate), everything else exactly one.
    pub fn r#where<I, V>(mut self, field: &str, condition: Condition, values: I) -> QueryResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<FilterValue>,
    {
        let field = identifier(field, "where")?;
        let values: Vec<FilterValue> = values.into_iter().map(Into::into).collect();

        if !condition.arity().accepts(values.len()) {
            return Err(QueryError::invalid_arity(field, condition, values.len()));
        }

        self.clauses.push(Clause {
            field: field.clone(),
            condition,
            first_param: self.params.len() + 1,
            operands: values.len(),
        });
        for value in values {
            self.params.push(value);
            self.param_fields.push(field.clone());
        }
        Ok(self)
    }

    /// Add every predicate in `set`, in order. An empty set is a no-op.
    pub fn where_set(mut self, set: &PredicateSet) -> QueryResult<Self> {
        for predicate in set {
            self = self.r#where(
                predicate.field(),
                predicate.condition(),
                predicate.values().iter().cloned(),
            )?;
        }
        Ok(self)
    }

    /// Add a sort key.
    pub fn order_by(mut self, field: &str, asc: bool) -> QueryResult<Self> {
        let field = identifier(field, "order by")?;
        self.orders.push((field, SortOrder::from_asc(asc)));
        Ok(self)
    }

    /// Add every sort key in `spec`, in order.
    pub fn order_by_spec(mut self, spec: &OrderSpec) -> QueryResult<Self> {
        for item in spec {
            self = self.order_by(item.field(), item.order().is_asc())?;
        }
        Ok(self)
    }

    /// Cap the number of rows. Must be positive.
    pub fn limit(mut self, max: i64) -> QueryResult<Self> {
        let capped = u32::try_from(max)
            .ok()
            .filter(|m| *m > 0)
            .ok_or_else(|| QueryError::invalid_limit(max))?;
        self.max_results = Some(capped);
        Ok(self)
    }

    // ============== Rendering ==============

    fn alias(&self) -> &str {
        self.source
            .as_ref()
            .map(|s| s.alias.as_str())
            .unwrap_or(DEFAULT_ALIAS)
    }

    fn qualify(&self, field: &str) -> String {
        if field.contains('.') {
            field.to_string()
        } else {
            format!("{}.{}", self.alias(), field)
        }
    }

    /// Render the query text.
    pub fn build(&self) -> String {
        let mut sql = String::from("SELECT ");

        if self.projection.is_empty() {
            sql.push_str(self.alias());
        } else {
            let fields: Vec<String> = self.projection.iter().map(|f| self.qualify(f)).collect();
            sql.push_str(&fields.join(", "));
        }

        if let Some(source) = &self.source {
            sql.push_str(" FROM ");
            sql.push_str(&source.entity);
            sql.push(' ');
            sql.push_str(&source.alias);
        }

        for join in &self.joins {
            let path = self.qualify(&join.path);
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&path);
            sql.push(' ');
            sql.push_str(&join.alias);
        }

        for (i, clause) in self.clauses.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            self.render_clause(&mut sql, clause);
        }

        for (i, (field, order)) in self.orders.iter().enumerate() {
            sql.push_str(if i == 0 { " ORDER BY " } else { ", " });
            sql.push_str(&self.qualify(field));
            sql.push(' ');
            sql.push_str(order.as_sql());
        }

        sql
    }

    fn render_clause(&self, sql: &mut String, clause: &Clause) {
        let field = self.qualify(&clause.field);
        let n = clause.first_param;
        match clause.condition {
            Condition::Between => {
                sql.push_str(&format!("{} BETWEEN ?{} AND ?{}", field, n, n + 1));
            }
            Condition::In if clause.operands == 0 => sql.push_str("1 = 0"),
            Condition::In => {
                let placeholders: Vec<String> =
                    (n..n + clause.operands).map(|i| format!("?{}", i)).collect();
                sql.push_str(&format!("{} IN ({})", field, placeholders.join(", ")));
            }
            other => {
                sql.push_str(&format!("{} {} ?{}", field, other.operator(), n));
            }
        }
    }

    /// The positional parameters; `params()[0]` binds `?1`.
    pub fn params(&self) -> &[FilterValue] {
        &self.params
    }

    /// Whether a field subset is selected.
    pub fn is_projection(&self) -> bool {
        !self.projection.is_empty()
    }

    fn bound(&self, max_results: Option<u32>) -> BoundQuery {
        BoundQuery {
            text: self.build(),
            entity: self
                .source
                .as_ref()
                .map(|s| s.entity.clone())
                .unwrap_or_default(),
            params: self.params.clone(),
            max_results,
        }
    }

    // ============== Execution ==============

    fn typed_source<T: Entity>(&self) -> QueryResult<&Source> {
        let source = self.require_source()?;
        let matches = match source.type_id {
            Some(id) => id == TypeId::of::<T>(),
            None => source.entity == T::ENTITY_NAME,
        };
        if !matches {
            return Err(QueryError::invalid_state(format!(
                "result type {} does not match source entity {}",
                T::ENTITY_NAME,
                source.entity
            ))
            .with_entity(&source.entity));
        }
        Ok(source)
    }

    fn require_source(&self) -> QueryResult<&Source> {
        self.source
            .as_ref()
            .ok_or_else(|| QueryError::invalid_state("no source entity; call from() first"))
    }

    async fn fetch<T: Entity>(&self, max_results: Option<u32>) -> QueryResult<Vec<T>> {
        self.typed_source::<T>()?;
        let query = self.bound(max_results);
        self.logger.log(&query);

        if self.projection.is_empty() {
            return self.engine.query_entities::<T>(query).await;
        }

        let rows = self.engine.query_rows(query).await?;
        rows.into_iter()
            .map(|row| T::schema().hydrate(&self.projection, row))
            .collect()
    }

    async fn fetch_rows(&self, max_results: Option<u32>) -> QueryResult<Vec<Vec<FilterValue>>> {
        self.require_source()?;
        let query = self.bound(max_results);
        self.logger.log(&query);
        self.engine.query_rows(query).await
    }

    /// Run the query and return every row, up to the limit.
    ///
    /// Partial projections are hydrated through `T`'s schema.
    pub async fn list<T: Entity>(self) -> QueryResult<Vec<T>> {
        self.fetch(self.max_results).await
    }

    /// Run the query and return the first row.
    ///
    /// With no rows, fails with `RecordNotFoundById` when exactly one
    /// parameter is bound and it binds an `id` field, and with
    /// `RecordNotFound` otherwise.
    pub async fn one<T: Entity>(self) -> QueryResult<T> {
        match self.fetch::<T>(Some(1)).await?.into_iter().next() {
            Some(entity) => Ok(entity),
            None => Err(self.not_found()),
        }
    }

    /// Run the query and return raw positional rows, up to the limit.
    pub async fn list_rows(self) -> QueryResult<Vec<Vec<FilterValue>>> {
        self.fetch_rows(self.max_results).await
    }

    /// Run the query and return the first raw row.
    pub async fn one_row(self) -> QueryResult<Vec<FilterValue>> {
        match self.fetch_rows(Some(1)).await?.into_iter().next() {
            Some(row) => Ok(row),
            None => Err(self.not_found()),
        }
    }

    /// Look up the root entity by primary key.
    ///
    /// Ignores joins, predicates and ordering. Requires `from::<T>()` and a
    /// whole-entity selection.
    pub async fn id<T: Entity>(self, id: impl Into<FilterValue>) -> QueryResult<T> {
        let id = id.into();
        if id.is_null() {
            return Err(QueryError::invalid_state("id() requires a non-null identifier"));
        }

        let source = self.typed_source::<T>()?;
        if source.type_id.is_none() {
            return Err(QueryError::invalid_state("id() requires a typed source; use from::<T>()")
                .with_entity(&source.entity));
        }
        if self.is_projection() {
            return Err(QueryError::invalid_state("id() cannot be combined with a field projection")
                .with_entity(&source.entity));
        }

        debug!(entity = T::ENTITY_NAME, id = %id, "Finding entity by id");
        match self.engine.find_by_id::<T>(id.clone()).await? {
            Some(entity) => Ok(entity),
            None => {
                warn!(entity = T::ENTITY_NAME, id = %id, "Entity not found for id");
                Err(QueryError::not_found_by_id(T::ENTITY_NAME, id))
            }
        }
    }

    fn not_found(&self) -> QueryError {
        let entity = self
            .source
            .as_ref()
            .map(|s| s.entity.as_str())
            .unwrap_or("Entity");

        let err = match self.inferred_id() {
            Some(id) => {
                warn!(entity, id = %id, "Entity not found for id");
                QueryError::not_found_by_id(entity, id.clone())
            }
            None => {
                warn!(entity, "Entity not found");
                QueryError::not_found(entity)
            }
        };
        err.with_query(self.build())
    }

    /// The single bound parameter, when it binds an identifier field
    /// (`id` or `*.id`, any case).
    fn inferred_id(&self) -> Option<&FilterValue> {
        match (self.params.as_slice(), self.param_fields.as_slice()) {
            ([value], [field]) if last_segment(field).eq_ignore_ascii_case("id") => Some(value),
            _ => None,
        }
    }
}

impl<E: QueryEngine> fmt::Display for QueryBuilder<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

impl<E: QueryEngine> fmt::Debug for QueryBuilder<'_, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("text", &self.build())
            .field("params", &self.params)
            .field("max_results", &self.max_results)
            .finish()
    }
}

/// Trim and check an identifier destined for query text.
fn identifier(raw: &str, clause: &str) -> QueryResult<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(QueryError::invalid_field(raw, format!("{} identifier must not be blank", clause)));
    }
    if !is_identifier(trimmed) {
        return Err(QueryError::invalid_field(
            raw,
            format!("{} identifier must match [A-Za-z_][A-Za-z0-9_.]*", clause),
        ));
    }
    Ok(trimmed.to_string())
}
