//! Integration tests for the query builder and filter decoder.
//!
//! These tests drive the public API end to end against an in-memory engine:
//! - Decoding untrusted filter tokens into predicates
//! - Building and running queries from those predicates
//! - Not-found handling for single-result fetches
//! - Writes delegated through the DAO

use std::sync::Mutex;

use pretty_assertions::assert_eq;
use sift::prelude::*;
use sift::{BoundQuery, BoxFuture, ErrorCode, IntoQueryError, SanitizerConfig, SiftConfig};

#[derive(Debug, Default, Clone, PartialEq)]
struct Produto {
    id: i64,
    nome: String,
    preco: f64,
    ativo: bool,
}

impl Entity for Produto {
    const ENTITY_NAME: &'static str = "Produto";

    fn schema() -> &'static EntitySchema<Self> {
        sift::entity_schema!(Produto { id, nome, preco, ativo })
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
struct Venda {
    id: i64,
    total: f64,
}

impl Entity for Venda {
    const ENTITY_NAME: &'static str = "Venda";

    fn schema() -> &'static EntitySchema<Self> {
        sift::entity_schema!(Venda { id, total })
    }
}

/// Serves the same canned rows for every query and records what it ran.
#[derive(Default)]
struct MemoryEngine {
    rows: Vec<Vec<FilterValue>>,
    queries: Mutex<Vec<BoundQuery>>,
    writes: Mutex<Vec<&'static str>>,
    offline: bool,
}

impl MemoryEngine {
    fn with_rows(rows: Vec<Vec<FilterValue>>) -> Self {
        Self {
            rows,
            ..Self::default()
        }
    }

    fn ran(&self) -> Vec<BoundQuery> {
        self.queries.lock().unwrap().clone()
    }

    fn serve(&self, query: BoundQuery) -> QueryResult<Vec<Vec<FilterValue>>> {
        let cap = query.max_results.map_or(usize::MAX, |m| m as usize);
        self.queries.lock().unwrap().push(query);
        if self.offline {
            let err = std::io::Error::new(std::io::ErrorKind::NotConnected, "engine offline");
            return Err(err.into_query_error());
        }
        Ok(self.rows.iter().take(cap).cloned().collect())
    }

    fn record<T: Entity>(&self, op: &'static str) -> QueryResult<()> {
        if self.offline {
            return Err(QueryError::database("engine offline").with_entity(T::ENTITY_NAME));
        }
        self.writes.lock().unwrap().push(op);
        Ok(())
    }
}

impl QueryEngine for MemoryEngine {
    fn query_entities<T: Entity>(&self, query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<T>>> {
        let fields: Vec<String> = T::schema().field_names().iter().map(|f| f.to_string()).collect();
        let result = self.serve(query).and_then(|rows| {
            rows.into_iter()
                .map(|row| T::schema().hydrate(&fields, row))
                .collect()
        });
        Box::pin(async move { result })
    }

    fn query_rows(&self, query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<Vec<FilterValue>>>> {
        let result = self.serve(query);
        Box::pin(async move { result })
    }

    fn find_by_id<T: Entity>(&self, id: FilterValue) -> BoxFuture<'_, QueryResult<Option<T>>> {
        let fields: Vec<String> = T::schema().field_names().iter().map(|f| f.to_string()).collect();
        let found = self.rows.iter().find(|row| row.first() == Some(&id)).cloned();
        Box::pin(async move { found.map(|row| T::schema().hydrate(&fields, row)).transpose() })
    }

    fn insert<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>> {
        let result = self.record::<T>("insert").map(|_| entity);
        Box::pin(async move { result })
    }

    fn update<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>> {
        let result = self.record::<T>("update").map(|_| entity);
        Box::pin(async move { result })
    }

    fn delete<T: Entity>(&self, _entity: T) -> BoxFuture<'_, QueryResult<()>> {
        let result = self.record::<T>("delete");
        Box::pin(async move { result })
    }
}

fn produto(id: i64, nome: &str, preco: f64, ativo: bool) -> Vec<FilterValue> {
    vec![id.into(), nome.into(), preco.into(), ativo.into()]
}

fn catalog() -> MemoryEngine {
    MemoryEngine::with_rows(vec![
        produto(1, "Saia", 79.9, true),
        produto(2, "Blusa", 49.5, true),
        produto(3, "Vestido", 129.0, false),
    ])
}

// ============================================================================
// Decoded filters feeding the builder
// ============================================================================

#[tokio::test]
async fn test_decoded_filters_become_bound_predicates() {
    let dao = Dao::new(catalog());

    let mut filters = dao.filters([
        "preco|GREATER_THAN|19.90",
        "nome|LIKE|%foo",
        "bad_token_no_pipes",
        "senha|EQUAL|x",
    ]);
    filters.allow_only(["preco", "nome"]);

    let items = filters.filters();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].field(), "preco");
    assert_eq!(items[0].condition(), Condition::GreaterThan);
    assert_eq!(items[0].value().to_string(), "19.90");
    assert_eq!(items[1].value(), &FilterValue::String("%foo".into()));

    let mut predicates = PredicateSet::new();
    filters.apply_to(&mut predicates);

    let produtos: Vec<Produto> = dao
        .select()
        .from::<Produto>()
        .unwrap()
        .where_set(&predicates)
        .unwrap()
        .order_by("nome", true)
        .unwrap()
        .list()
        .await
        .unwrap();
    assert_eq!(produtos.len(), 3);

    let ran = dao.engine().ran();
    assert_eq!(ran.len(), 1);
    assert_eq!(
        ran[0].text,
        "SELECT c FROM Produto c WHERE c.preco > ?1 AND c.nome LIKE ?2 ORDER BY c.nome ASC"
    );
    assert_eq!(ran[0].entity, "Produto");
    assert_eq!(ran[0].params.len(), 2);
    assert_eq!(ran[0].params[1], FilterValue::String("%foo".into()));
}

#[tokio::test]
async fn test_hostile_tokens_never_reach_query_text() {
    let dao = Dao::new(catalog());
    let filters = dao.filters([
        "nome; DROP TABLE x|EQUAL|a",
        "nome|EQUAL|1 OR 1=1",
        "nome|EQUAL|<script>alert(1)</script>",
        "nome|EXECUTE|a",
        "ativo|EQUAL|true",
    ]);

    let mut predicates = PredicateSet::new();
    filters.apply_to(&mut predicates);
    assert_eq!(predicates.len(), 1);

    let q = dao.select().from::<Produto>().unwrap().where_set(&predicates).unwrap();
    let text = q.build();
    assert_eq!(text, "SELECT c FROM Produto c WHERE c.ativo = ?1");
    assert!(!text.contains("DROP"));
    assert_eq!(q.params(), &[FilterValue::Bool(true)]);
}

#[tokio::test]
async fn test_configured_sanitizer_truncates_values() {
    let config = SiftConfig {
        sanitizer: SanitizerConfig { max_value_length: 4 },
        ..SiftConfig::default()
    };
    let dao = Dao::with_config(catalog(), &config);
    assert_eq!(dao.sanitizer().max_value_length(), 4);

    let filters = dao.filters(["nome|LIKE|Vestido"]);
    assert_eq!(filters.filters()[0].value(), &FilterValue::String("Vest".into()));
}

// ============================================================================
// Terminal operations
// ============================================================================

#[tokio::test]
async fn test_one_caps_the_fetch() {
    let dao = Dao::new(catalog());
    let first: Produto = dao
        .select()
        .from::<Produto>()
        .unwrap()
        .r#where("ativo", Condition::Equal, [true])
        .unwrap()
        .one()
        .await
        .unwrap();

    assert_eq!(first.nome, "Saia");
    assert_eq!(dao.engine().ran()[0].max_results, Some(1));
}

#[tokio::test]
async fn test_one_without_rows_infers_identifier() {
    let dao = Dao::new(MemoryEngine::default());

    let err = dao
        .select()
        .from::<Venda>()
        .unwrap()
        .r#where("cliente.id", Condition::Equal, [42i64])
        .unwrap()
        .one::<Venda>()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFoundById);
    assert_eq!(err.identifier(), Some(&FilterValue::BigInt(42)));

    let err = dao
        .select()
        .from::<Venda>()
        .unwrap()
        .r#where("cliente.id", Condition::Equal, [42i64])
        .unwrap()
        .r#where("total", Condition::GreaterThan, [10.0])
        .unwrap()
        .one::<Venda>()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFound);
    assert!(err.identifier().is_none());

    let err = dao
        .select()
        .from::<Venda>()
        .unwrap()
        .one::<Venda>()
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFound);
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_projection_hydrates_selected_fields() {
    let engine = MemoryEngine::with_rows(vec![vec!["Saia".into(), 79.9.into()]]);
    let dao = Dao::new(engine);

    let produtos: Vec<Produto> = dao
        .select_fields(["nome", " ", "preco"])
        .unwrap()
        .from::<Produto>()
        .unwrap()
        .list()
        .await
        .unwrap();

    assert_eq!(
        produtos,
        vec![Produto {
            nome: "Saia".into(),
            preco: 79.9,
            ..Produto::default()
        }]
    );
    assert_eq!(dao.engine().ran()[0].text, "SELECT c.nome, c.preco FROM Produto c");
}

#[tokio::test]
async fn test_id_lookup() {
    let dao = Dao::new(catalog());

    let found: Produto = dao.select().from::<Produto>().unwrap().id(2i64).await.unwrap();
    assert_eq!(found.nome, "Blusa");

    let err = dao
        .select()
        .from::<Produto>()
        .unwrap()
        .id::<Produto>(99i64)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::RecordNotFoundById);
    assert_eq!(err.message, "Produto not found for id 99");
}

#[tokio::test]
async fn test_result_type_must_match_source() {
    let dao = Dao::new(catalog());
    let err = dao
        .select()
        .from::<Produto>()
        .unwrap()
        .list::<Venda>()
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::InvalidState);
    assert!(dao.engine().ran().is_empty());
}

#[tokio::test]
async fn test_engine_failure_propagates() {
    let dao = Dao::new(MemoryEngine {
        offline: true,
        ..MemoryEngine::default()
    });

    let err = dao.select().from::<Produto>().unwrap().list::<Produto>().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);
    assert!(!err.is_not_found());
}

// ============================================================================
// Builder misuse
// ============================================================================

#[test]
fn test_arity_is_enforced_for_every_condition() {
    let engine = MemoryEngine::default();
    for condition in Condition::ALL {
        let one = QueryBuilder::new(&engine).r#where("x", condition, [1]);
        let two = QueryBuilder::new(&engine).r#where("x", condition, [1, 2]);
        match condition {
            Condition::Between => {
                assert!(one.is_err());
                assert!(two.is_ok());
            }
            Condition::In => {
                assert!(one.is_ok());
                assert!(two.is_ok());
            }
            _ => {
                assert!(one.is_ok());
                assert_eq!(two.unwrap_err().code, ErrorCode::InvalidArity);
            }
        }
    }
}

#[test]
fn test_malformed_identifiers_are_rejected() {
    let engine = MemoryEngine::default();

    let err = QueryBuilder::new(&engine)
        .r#where("nome; DROP TABLE x", Condition::Equal, ["a"])
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidField);

    let err = QueryBuilder::new(&engine).order_by("nome DESC, 1", true).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidField);

    let err = QueryBuilder::new(&engine).limit(0).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidLimit);
    assert!(err.is_validation());
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_dao_writes_delegate_to_engine() {
    let dao = Dao::new(catalog());
    let novo = Produto {
        id: 4,
        nome: "Camisa".into(),
        preco: 59.0,
        ativo: true,
    };

    let saved = dao.insert(novo.clone()).await.unwrap();
    assert_eq!(saved, novo);
    let updated = dao.update(Produto { ativo: false, ..saved }).await.unwrap();
    assert!(!updated.ativo);
    dao.delete(updated).await.unwrap();

    assert_eq!(*dao.engine().writes.lock().unwrap(), vec!["insert", "update", "delete"]);
}

#[tokio::test]
async fn test_dao_write_failure() {
    let dao = Dao::new(MemoryEngine {
        offline: true,
        ..MemoryEngine::default()
    });

    let err = dao.insert(Venda::default()).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::DatabaseError);
    assert_eq!(err.context.entity.as_deref(), Some("Venda"));
}
