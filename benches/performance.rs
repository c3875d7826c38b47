//! R-tree 性能基准测试
//!
//! 按分裂策略分组比较插入、区域查询和删除。
//! 指数分裂在每次分裂时枚举所有划分，只在较小的节点容量下测试。

use boxtree::{BoundingBox, RTree, SplitKind};
use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const BENCHMARK_SIZE: usize = 10_000;
const COORDINATE_RANGE: f64 = 1000.0;

/// 性能测试配置
struct BenchConfig {
    size: usize,
    min_entries: usize,
    max_entries: usize,
    seed: u64,
}

impl BenchConfig {
    fn for_kind(kind: SplitKind) -> Self {
        match kind {
            SplitKind::Exponential => Self {
                size: BENCHMARK_SIZE / 5,
                min_entries: 2,
                max_entries: 4,
                seed: 42,
            },
            _ => Self {
                size: BENCHMARK_SIZE,
                min_entries: 4,
                max_entries: 16,
                seed: 42,
            },
        }
    }

    fn build(&self, kind: SplitKind, data: &[(BoundingBox, u64)]) -> RTree<u64> {
        let mut rtree = RTree::with_split(kind, self.min_entries, self.max_entries);
        for (bounding_box, value) in data {
            rtree
                .insert(*bounding_box, *value)
                .expect("generated values are unique");
        }
        rtree
    }
}

/// 生成测试数据
fn generate_test_data(count: usize, seed: u64) -> Vec<(BoundingBox, u64)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count as u64)
        .map(|value| {
            let x = rng.gen_range(0.0..COORDINATE_RANGE);
            let y = rng.gen_range(0.0..COORDINATE_RANGE);
            (BoundingBox::new(x, y, 1.0, 1.0), value)
        })
        .collect()
}

/// 生成查询框
fn generate_queries(count: usize, coverage_percent: f64, seed: u64) -> Vec<BoundingBox> {
    let mut rng = StdRng::seed_from_u64(seed + 1000);
    let side = COORDINATE_RANGE * (coverage_percent / 100.0).sqrt();
    (0..count)
        .map(|_| {
            let x = rng.gen_range(0.0..(COORDINATE_RANGE - side));
            let y = rng.gen_range(0.0..(COORDINATE_RANGE - side));
            BoundingBox::new(x, y, side, side)
        })
        .collect()
}

/// 插入性能测试
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.sample_size(10);
    for kind in SplitKind::ALL {
        let config = BenchConfig::for_kind(kind);
        let test_data = generate_test_data(config.size, config.seed);
        group.bench_with_input(BenchmarkId::from_parameter(kind), &test_data, |b, data| {
            b.iter(|| config.build(kind, data));
        });
    }
    group.finish();
}

/// 区域查询性能测试
fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_1%");
    for kind in SplitKind::ALL {
        let config = BenchConfig::for_kind(kind);
        let test_data = generate_test_data(config.size, config.seed);
        let rtree = config.build(kind, &test_data);
        let queries = generate_queries(1_000, 1.0, config.seed);

        group.bench_with_input(BenchmarkId::from_parameter(kind), &queries, |b, queries| {
            b.iter(|| {
                queries
                    .iter()
                    .map(|query| rtree.find(query).len())
                    .sum::<usize>()
            });
        });
    }
    group.finish();
}

/// 删除一半数据性能测试
fn bench_remove(c: &mut Criterion) {
    let mut group = c.benchmark_group("remove_half");
    group.sample_size(10);
    for kind in SplitKind::ALL {
        let config = BenchConfig::for_kind(kind);
        let test_data = generate_test_data(config.size, config.seed);

        group.bench_function(BenchmarkId::from_parameter(kind), |b| {
            b.iter_batched(
                || config.build(kind, &test_data),
                |mut rtree| {
                    for (_, value) in &test_data[..config.size / 2] {
                        rtree.remove(value);
                    }
                    rtree
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert, bench_search, bench_remove);
criterion_main!(benches);
