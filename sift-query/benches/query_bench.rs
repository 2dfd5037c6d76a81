//! Benchmarks for query rendering and filter decoding.
//!
//! Run with: `cargo bench --package sift-query --bench query_bench`

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use sift_query::{
    BoundQuery, BoxFuture, Condition, Entity, EntitySchema, FilterQuery, FilterValue, PredicateSet,
    QueryBuilder, QueryEngine, QueryResult, Sanitizer, entity_schema,
};

#[derive(Debug, Default)]
struct Produto {
    id: i64,
    nome: String,
    ativo: bool,
}

impl Entity for Produto {
    const ENTITY_NAME: &'static str = "Produto";

    fn schema() -> &'static EntitySchema<Self> {
        entity_schema!(Produto { id, nome, ativo })
    }
}

struct NullEngine;

impl QueryEngine for NullEngine {
    fn query_entities<T: Entity>(&self, _query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<T>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn query_rows(&self, _query: BoundQuery) -> BoxFuture<'_, QueryResult<Vec<Vec<FilterValue>>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn find_by_id<T: Entity>(&self, _id: FilterValue) -> BoxFuture<'_, QueryResult<Option<T>>> {
        Box::pin(async { Ok(None) })
    }

    fn insert<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>> {
        Box::pin(async move { Ok(entity) })
    }

    fn update<T: Entity>(&self, entity: T) -> BoxFuture<'_, QueryResult<T>> {
        Box::pin(async move { Ok(entity) })
    }

    fn delete<T: Entity>(&self, _entity: T) -> BoxFuture<'_, QueryResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

// ============================================================================
// Builder rendering
// ============================================================================

fn bench_build(c: &mut Criterion) {
    let engine = NullEngine;
    let mut group = c.benchmark_group("build");

    group.bench_function("simple", |b| {
        b.iter(|| {
            let q = QueryBuilder::new(&engine)
                .from::<Produto>()
                .and_then(|q| q.r#where("ativo", Condition::Equal, [true]))
                .and_then(|q| q.order_by("nome", true));
            black_box(q.map(|q| q.build()))
        });
    });

    for size in [1usize, 10, 100] {
        let ids: Vec<i64> = (0..size as i64).collect();
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("in_list", size), &ids, |b, ids| {
            b.iter(|| {
                let q = QueryBuilder::new(&engine)
                    .from::<Produto>()
                    .and_then(|q| q.r#where("id", Condition::In, ids.iter().copied()));
                black_box(q.map(|q| q.build()))
            });
        });
    }

    group.finish();
}

// ============================================================================
// Filter decoding
// ============================================================================

fn tokens(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| match i % 4 {
            0 => format!("preco|GREATER_THAN|{}.90", i),
            1 => format!("nome|LIKE|%produto {}%", i),
            2 => "ativo|EQUAL|true".to_string(),
            _ => "nome|EQUAL|1 OR 1=1".to_string(),
        })
        .collect()
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    for size in [4usize, 32, 256] {
        let raw = tokens(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("tokens", size), &raw, |b, raw| {
            b.iter(|| {
                let mut query = FilterQuery::new(raw.iter().cloned());
                query.allow_only(["preco", "nome", "ativo"]);
                let mut set = PredicateSet::new();
                query.apply_to(&mut set);
                black_box(set.len())
            });
        });
    }

    let sanitizer = Sanitizer::default();
    group.bench_function("safe_value", |b| {
        b.iter(|| black_box(sanitizer.safe_value(black_box("  Saia midi <b>floral</b>  "))));
    });

    group.finish();
}

criterion_group!(benches, bench_build, bench_decode);
criterion_main!(benches);
