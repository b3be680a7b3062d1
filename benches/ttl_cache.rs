//! TTL LRU 缓存与查询服务性能基准测试

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use iplocator::cache::LruTtlCache;
use iplocator::errors::Result;
use iplocator::services::LookupService;
use iplocator::source::{GeoRecord, LookupSource};

const TTL: Duration = Duration::from_secs(600);

fn record() -> GeoRecord {
    GeoRecord::new("US", "Mountain View")
}

fn filled_cache(capacity: usize) -> Arc<LruTtlCache<GeoRecord>> {
    let cache = Arc::new(LruTtlCache::new(capacity).unwrap());
    for i in 0..capacity {
        cache.insert(&format!("10.0.{}.{}", i / 256, i % 256), record(), TTL);
    }
    cache
}

// ============== LruTtlCache 基准测试 ==============

fn bench_cache_get_hit(c: &mut Criterion) {
    let cache = filled_cache(1_000);
    c.bench_function("ttl_cache/get_hit", |b| {
        b.iter(|| {
            assert!(cache.get("10.0.1.244").is_some());
        });
    });
}

fn bench_cache_get_miss(c: &mut Criterion) {
    let cache = filled_cache(1_000);
    c.bench_function("ttl_cache/get_miss", |b| {
        b.iter(|| {
            assert!(cache.get("192.168.0.1").is_none());
        });
    });
}

fn bench_cache_insert_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("ttl_cache/insert_evicting");
    for capacity in [100usize, 1_000, 10_000] {
        let cache = filled_cache(capacity);
        let mut n = 0u64;
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                n += 1;
                cache.insert(&format!("key_{}", n), record(), TTL);
            });
        });
    }
    group.finish();
}

// ============== LookupService 基准测试 ==============

struct StaticSource;

#[async_trait]
impl LookupSource for StaticSource {
    async fn lookup(&self, _ip: &str) -> Result<GeoRecord> {
        Ok(record())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

fn bench_resolve_cached(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let service = Arc::new(LookupService::new(
        Arc::new(StaticSource),
        filled_cache(1_000),
        TTL,
        Duration::from_secs(2),
    ));

    c.bench_function("lookup_service/resolve_hit", |b| {
        b.to_async(&rt).iter(|| {
            let s = Arc::clone(&service);
            async move {
                assert!(s.resolve("10.0.0.1").await.is_ok());
            }
        });
    });
}

criterion_group!(
    benches,
    bench_cache_get_hit,
    bench_cache_get_miss,
    bench_cache_insert_with_eviction,
    bench_resolve_cached
);
criterion_main!(benches);
