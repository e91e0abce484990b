use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use orderdesk::pipeline::{ContextData, Pipeline, PipelineControl};
use orderdesk::{reporting, Normalizer, NormalizerConfig, RawBilling, RawLineItem, RawOrder, RelayResult, StoreAttributionTable};
use std::sync::Arc;
use tokio::runtime::Runtime;

const SKUS: [&str; 5] = ["snack-toast", "pub-beer", "pizzaria-margherita", "brasserie-steak", "misc-gift"];

// --- Synthetic order set ---
fn synthetic_orders(count: usize) -> Vec<RawOrder> {
  (0..count)
    .map(|i| RawOrder {
      id: i as i64 + 1,
      created_at: Some("2024-06-01T12:30:00".to_string()),
      status: if i % 3 == 0 { "processing" } else { "completed" }.to_string(),
      billing: RawBilling {
        first_name: format!("Customer{}", i % 40),
        last_name: "Bench".to_string(),
        ..Default::default()
      },
      payment_method: Some("Card".to_string()),
      line_items: (0..(i % 4 + 1))
        .map(|j| RawLineItem {
          sku: SKUS[(i + j) % SKUS.len()].to_string(),
          name: Some(format!("Product{}", (i + j) % 25)),
          quantity: Some((j % 3 + 1) as i64),
          line_total: Some(format!("{}.{:02}", 3 + j, (i * 7) % 100)),
        })
        .collect(),
      ..Default::default()
    })
    .collect()
}

fn normalizer() -> Normalizer {
  Normalizer::new(Arc::new(StoreAttributionTable::builtin()), NormalizerConfig::default())
}

// --- Benchmark Functions ---

fn bench_normalize(c: &mut Criterion) {
  let mut group = c.benchmark_group("Normalize");
  let normalizer = normalizer();
  for size in [100usize, 1_000, 10_000] {
    let raws = synthetic_orders(size);
    group.throughput(Throughput::Elements(size as u64));
    group.bench_with_input(BenchmarkId::from_parameter(size), &raws, |b, raws| {
      b.iter(|| normalizer.normalize_all(raws))
    });
  }
  group.finish();
}

fn bench_reports(c: &mut Criterion) {
  let mut group = c.benchmark_group("Reports");
  let orders: Vec<_> = normalizer()
    .normalize_all(&synthetic_orders(5_000))
    .into_iter()
    .filter(|o| o.belongs_to("Pub"))
    .collect();
  group.throughput(Throughput::Elements(orders.len() as u64));
  group.bench_function("top_customers", |b| b.iter(|| reporting::top_customers(&orders, 5)));
  group.bench_function("top_products", |b| b.iter(|| reporting::top_products(&orders, 5)));
  group.bench_function("total_sales", |b| b.iter(|| reporting::total_sales(&orders)));
  group.finish();
}

#[derive(Default)]
struct StepCounter {
  visited: u64,
}

async fn count_step(ctx: ContextData<StepCounter>) -> RelayResult<PipelineControl> {
  ctx.write().visited += 1;
  Ok(PipelineControl::Continue)
}

fn bench_pipeline_overhead(c: &mut Criterion) {
  let mut group = c.benchmark_group("PipelineOverhead");
  let rt = Runtime::new().unwrap();

  for num_steps in [1usize, 7, 20] {
    let names: Vec<String> = (0..num_steps).map(|i| format!("step_{}", i)).collect();
    let step_defs: Vec<_> = names.iter().map(|n| (n.as_str(), false, None)).collect();
    let mut pipeline = Pipeline::<StepCounter>::new("bench", &step_defs);
    for name in &names {
      pipeline.on(name, count_step);
    }
    let pipeline = Arc::new(pipeline);

    group.throughput(Throughput::Elements(num_steps as u64));
    group.bench_with_input(BenchmarkId::from_parameter(num_steps), &num_steps, |b, _| {
      b.to_async(&rt).iter_batched(
        || ContextData::new(StepCounter::default()),
        |ctx| {
          let p = pipeline.clone();
          async move { p.run(ctx).await.unwrap() }
        },
        criterion::BatchSize::SmallInput,
      );
    });
  }
  group.finish();
}

criterion_group!(benches, bench_normalize, bench_reports, bench_pipeline_overhead);
criterion_main!(benches);
