pub mod ttl_lru;

use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tracing::debug;

use crate::utils::periodic::PeriodicTask;

pub use ttl_lru::LruTtlCache;

/// 缓存设置（由配置验证得到）
#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub capacity: usize,
    /// 查询结果的固定 TTL
    pub ttl: Duration,
    /// 主动清扫过期条目的间隔，`None` 表示只依赖 LRU 淘汰
    pub purge_interval: Option<Duration>,
}

/// 启动过期条目清扫任务
///
/// 任务只持有缓存的弱引用，缓存被释放后自动退出。
pub fn spawn_purge_task<V>(cache: &Arc<LruTtlCache<V>>, interval: Duration) -> PeriodicTask
where
    V: Clone + Send + 'static,
{
    let weak: Weak<LruTtlCache<V>> = Arc::downgrade(cache);
    PeriodicTask::spawn("cache-purge", interval, move || {
        let Some(cache) = weak.upgrade() else {
            return ControlFlow::Break(());
        };
        let purged = cache.purge_expired();
        if purged > 0 {
            debug!("Cache purge removed {} expired entries", purged);
        }
        ControlFlow::Continue(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_reclaims_expired_entries() {
        let cache = Arc::new(LruTtlCache::new(8).unwrap());
        cache.insert("short", 1u32, Duration::from_secs(1));
        cache.insert("long", 2u32, Duration::from_secs(600));

        let task = spawn_purge_task(&cache, Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        assert!(!cache.contains_raw("short"));
        assert!(cache.contains_raw("long"));
        task.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_exits_when_cache_dropped() {
        let cache = Arc::new(LruTtlCache::<u32>::new(8).unwrap());
        let task = spawn_purge_task(&cache, Duration::from_secs(1));
        drop(cache);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;
        assert!(task.is_finished());
    }
}
