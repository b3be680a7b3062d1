//! IP 地理位置查询服务
//!
//! Cache-aside：先查缓存，未命中再访问数据源并写回缓存。
//! 数据源错误不写入缓存；"未找到"（空记录）会被缓存。

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, trace};

use crate::cache::LruTtlCache;
use crate::errors::{IpLocatorError, Result};
use crate::source::{GeoRecord, LookupSource};

pub struct LookupService {
    source: Arc<dyn LookupSource>,
    cache: Arc<LruTtlCache<GeoRecord>>,
    ttl: Duration,
    source_timeout: Duration,
}

impl LookupService {
    pub fn new(
        source: Arc<dyn LookupSource>,
        cache: Arc<LruTtlCache<GeoRecord>>,
        ttl: Duration,
        source_timeout: Duration,
    ) -> Self {
        Self {
            source,
            cache,
            ttl,
            source_timeout,
        }
    }

    /// 解析 IP 的地理位置
    ///
    /// 同一 key 的并发未命中会各自访问数据源（不做请求合并）。
    pub async fn resolve(&self, key: &str) -> Result<GeoRecord> {
        if let Some(record) = self.cache.get(key) {
            trace!("Cache hit for {}", key);
            return Ok(record);
        }
        trace!("Cache miss for {}, querying {}", key, self.source.name());

        let record = match tokio::time::timeout(self.source_timeout, self.source.lookup(key)).await
        {
            Ok(Ok(record)) => record,
            Ok(Err(e)) => {
                error!("Lookup source {} failed for {}: {}", self.source.name(), key, e);
                return Err(match e {
                    IpLocatorError::Validation(_) | IpLocatorError::Source(_) => e,
                    other => IpLocatorError::lookup_source(other.message()),
                });
            }
            Err(_) => {
                error!(
                    "Lookup source {} timed out for {} after {:?}",
                    self.source.name(),
                    key,
                    self.source_timeout
                );
                return Err(IpLocatorError::lookup_source(format!(
                    "lookup timed out after {:?}",
                    self.source_timeout
                )));
            }
        };

        self.cache.insert(key, record.clone(), self.ttl);
        Ok(record)
    }

    pub fn cache(&self) -> &Arc<LruTtlCache<GeoRecord>> {
        &self.cache
    }

    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// 记录调用次数的数据源桩
    #[derive(Default)]
    struct CountingSource {
        records: HashMap<String, GeoRecord>,
        calls: AtomicUsize,
        fail: AtomicBool,
        delay: Option<Duration>,
    }

    impl CountingSource {
        fn with(ip: &str, country: &str, city: &str) -> Self {
            let mut records = HashMap::new();
            records.insert(ip.to_string(), GeoRecord::new(country, city));
            Self {
                records,
                ..Default::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LookupSource for CountingSource {
        async fn lookup(&self, ip: &str) -> Result<GeoRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(IpLocatorError::backend_unavailable("connection reset"));
            }
            Ok(self.records.get(ip).cloned().unwrap_or_default())
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn service(source: &Arc<CountingSource>, ttl: Duration) -> LookupService {
        LookupService::new(
            Arc::clone(source) as Arc<dyn LookupSource>,
            Arc::new(LruTtlCache::new(16).unwrap()),
            ttl,
            Duration::from_secs(2),
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit_calls_source_once() {
        let source = Arc::new(CountingSource::with("8.8.8.8", "US", "Mountain View"));
        let svc = service(&source, Duration::from_secs(600));

        let first = svc.resolve("8.8.8.8").await.unwrap();
        let second = svc.resolve("8.8.8.8").await.unwrap();

        assert_eq!(first, GeoRecord::new("US", "Mountain View"));
        assert_eq!(first, second);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_cached() {
        let source = Arc::new(CountingSource::default());
        let svc = service(&source, Duration::from_secs(600));

        assert!(svc.resolve("1.1.1.1").await.unwrap().is_empty());
        assert!(svc.resolve("1.1.1.1").await.unwrap().is_empty());
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let source = Arc::new(CountingSource::with("8.8.8.8", "US", ""));
        let svc = service(&source, Duration::from_secs(600));

        source.fail.store(true, Ordering::SeqCst);
        let err = svc.resolve("8.8.8.8").await.unwrap_err();
        assert!(matches!(err, IpLocatorError::Source(_)));
        assert!(!svc.cache().contains_raw("8.8.8.8"));

        source.fail.store(false, Ordering::SeqCst);
        assert_eq!(svc.resolve("8.8.8.8").await.unwrap().country, "US");
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetched() {
        let source = Arc::new(CountingSource::with("8.8.8.8", "US", ""));
        let svc = service(&source, Duration::from_secs(600));

        svc.resolve("8.8.8.8").await.unwrap();
        tokio::time::sleep(Duration::from_secs(601)).await;
        svc.resolve("8.8.8.8").await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_source_timeout_is_source_error() {
        let source = Arc::new(CountingSource {
            delay: Some(Duration::from_secs(60)),
            ..CountingSource::with("8.8.8.8", "US", "")
        });
        let svc = service(&source, Duration::from_secs(600));

        let err = svc.resolve("8.8.8.8").await.unwrap_err();
        assert!(matches!(err, IpLocatorError::Source(_)));
        assert!(!svc.cache().contains_raw("8.8.8.8"));
    }
}
