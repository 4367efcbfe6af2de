//! Engine Performance Benchmarks for switchpush
//!
//! This benchmark suite covers the hot paths of a push run:
//! - Fan-out of a trivial task over growing host counts
//! - Effect of the worker bound on I/O-bound transports
//! - Nested subtask result building
//! - Host filtering over a large inventory
//!
//! Run with: cargo bench --bench engine_benchmark

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

use switchpush::executor::{task_fn, Engine, EngineConfig, RunParams, TaskOutput};
use switchpush::inventory::{Defaults, Group, Host, HostDef, HostFilter, HostSet, Inventory};
use switchpush::tasks::{InterfacePush, DEFAULT_NXOS_COMMANDS};
use switchpush::transport::{Transport, TransportResult};

// ============================================================================
// Constants for benchmark configuration
// ============================================================================

/// Simulated round trip of one config push
const PUSH_LATENCY_MICROS: u64 = 200;

/// Host counts used for scaling runs
const HOST_COUNTS: [usize; 4] = [10, 50, 100, 500];

// ============================================================================
// Helper Functions
// ============================================================================

/// Create a tokio runtime with the specified number of worker threads
fn create_runtime(workers: usize) -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(workers)
        .enable_all()
        .build()
        .unwrap()
}

fn hosts(count: usize) -> HostSet {
    (0..count).map(|i| Host::new(format!("sw{:04}", i))).collect()
}

fn commands() -> Vec<String> {
    DEFAULT_NXOS_COMMANDS.iter().map(|s| s.to_string()).collect()
}

/// Transport that sleeps instead of talking to a device
struct SleepTransport {
    latency: Duration,
}

#[async_trait]
impl Transport for SleepTransport {
    async fn push_config(&self, _host: &Host, commands: &[String]) -> TransportResult<String> {
        tokio::time::sleep(self.latency).await;
        Ok(commands.join("\n"))
    }
}

// ============================================================================
// Benchmark: Fan-out Overhead
// ============================================================================

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_fan_out");
    let rt = create_runtime(4);
    let task = Arc::new(task_fn("noop", |_| Ok(TaskOutput::ok())));

    for count in HOST_COUNTS.iter() {
        let set = hosts(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("noop_task", count), &set, |b, set| {
            let engine = Engine::new(EngineConfig::new(20));
            b.to_async(&rt).iter(|| async {
                let run = engine.run("bench", task.clone(), set).await;
                black_box(run.len());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Worker Bound
// ============================================================================

fn bench_worker_bound(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_worker_bound");
    group.sample_size(20);
    let rt = create_runtime(4);
    let set = hosts(100);
    let transport = Arc::new(SleepTransport {
        latency: Duration::from_micros(PUSH_LATENCY_MICROS),
    });
    let task = Arc::new(InterfacePush::new(transport, commands()));

    for workers in [1, 5, 20, 50, 100].iter() {
        group.bench_with_input(BenchmarkId::new("interface_push", workers), workers, |b, &w| {
            let engine = Engine::new(EngineConfig::new(w));
            b.to_async(&rt).iter(|| async {
                let run = engine
                    .run_with("bench", task.clone(), &set, RunParams::new(false))
                    .await;
                black_box(run.failed());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Dry Run Result Tree
// ============================================================================

fn bench_dry_run_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_dry_run");
    let rt = create_runtime(4);
    let transport = Arc::new(SleepTransport {
        latency: Duration::ZERO,
    });
    let task = Arc::new(InterfacePush::new(transport, commands()));

    for count in HOST_COUNTS.iter() {
        let set = hosts(*count);
        group.throughput(Throughput::Elements(*count as u64));

        group.bench_with_input(BenchmarkId::new("summary", count), &set, |b, set| {
            let engine = Engine::default();
            b.to_async(&rt).iter(|| async {
                let run = engine
                    .run_with("bench", task.clone(), set, RunParams::new(true))
                    .await;
                black_box(run.summary());
            });
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Host Filtering
// ============================================================================

fn bench_filtering(c: &mut Criterion) {
    let mut group = c.benchmark_group("inventory_filter");

    let groups = vec![
        Group::new("fabric"),
        Group::new("cisco_nxos").with_parent("fabric"),
        Group::new("arista_eos").with_parent("fabric"),
    ];
    let defs = (0..2000)
        .map(|i| {
            let group = if i % 3 == 0 { "arista_eos" } else { "cisco_nxos" };
            HostDef::new(format!("sw{:04}", i)).with_group(group)
        })
        .collect();
    let inventory = Inventory::from_parts(defs, groups, Defaults::default()).unwrap();

    let filters = [
        ("group", HostFilter::group("cisco_nxos")),
        ("group_tree", HostFilter::group_tree("fabric")),
        (
            "composed",
            HostFilter::group_tree("fabric") & !HostFilter::group("arista_eos"),
        ),
        ("pattern", HostFilter::parse("sw1*:!arista_eos").unwrap()),
    ];

    for (name, filter) in filters.iter() {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(inventory.filter(filter).len()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fan_out,
    bench_worker_bound,
    bench_dry_run_tree,
    bench_filtering
);
criterion_main!(benches);
