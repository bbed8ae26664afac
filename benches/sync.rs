//! Update loop benchmarks against an in-memory SQLite store.
//!
//! Run with: cargo bench --bench sync

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use productsync::db::{CommitMode, SqliteBackend, UpdateTarget};
use productsync::sync::Synchronizer;
use productsync::types::{ProductCatalog, ProductRecord};
use serde_json::json;
use tokio::runtime::Runtime;

fn create_runtime() -> Runtime {
  tokio::runtime::Builder::new_current_thread()
    .enable_all()
    .build()
    .unwrap()
}

fn catalog(size: i64) -> ProductCatalog {
  ProductCatalog {
    products: (1..=size)
      .map(|id| ProductRecord {
        product_id: id,
        caracteristicas: json!({
          "origin": "Brazil",
          "package": {"units": 24, "unit": "12 oz cans"},
          "tags": ["beverage", "imported"],
          "weight": id as f64 * 0.5
        }),
      })
      .collect(),
  }
}

fn seeded_backend(rt: &Runtime, rows: i64) -> Arc<SqliteBackend> {
  rt.block_on(async {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let mut sql = String::from(
      "CREATE TABLE products (product_id INTEGER PRIMARY KEY, caracteristicas_json TEXT);",
    );
    for id in 1..=rows {
      sql.push_str(&format!("INSERT INTO products (product_id) VALUES ({});", id));
    }
    backend.execute_batch(&sql).await.unwrap();
    Arc::new(backend)
  })
}

fn bench_prepare(c: &mut Criterion) {
  let mut group = c.benchmark_group("prepare");
  for size in [10, 1_000] {
    let catalog = catalog(size);
    group.throughput(Throughput::Elements(size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &catalog, |b, catalog| {
      b.iter(|| black_box(Synchronizer::prepare(catalog).unwrap()));
    });
  }
  group.finish();
}

fn bench_run(c: &mut Criterion) {
  let rt = create_runtime();
  let mut group = c.benchmark_group("run");

  for size in [10, 1_000] {
    let catalog = catalog(size);
    let backend = seeded_backend(&rt, size);
    group.throughput(Throughput::Elements(size as u64));

    for mode in [CommitMode::Single, CommitMode::PerRecord] {
      let sync = Synchronizer::new(backend.clone(), UpdateTarget::default(), mode);
      group.bench_with_input(
        BenchmarkId::new(mode.to_string(), size),
        &catalog,
        |b, catalog| {
          b.iter(|| rt.block_on(async { black_box(sync.run(catalog).await.unwrap()) }));
        },
      );
    }
  }
  group.finish();
}

criterion_group!(benches, bench_prepare, bench_run);
criterion_main!(benches);
