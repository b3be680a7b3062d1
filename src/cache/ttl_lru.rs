//! 容量有界的 LRU 缓存，每个条目带独立的过期时间
//!
//! 过期条目在读取时视为不存在，但不会因读取被移除：
//! 它们仍占用容量，直到被 LRU 淘汰、被覆盖，或被 `purge_expired` 清扫。

use std::num::NonZeroUsize;
use std::time::Duration;

use lru::LruCache;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

use crate::errors::{IpLocatorError, Result};

struct CacheEntry<V> {
    value: V,
    /// `None` 表示 ttl 过大，永不过期
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now > deadline)
    }
}

pub struct LruTtlCache<V> {
    inner: Mutex<LruCache<String, CacheEntry<V>>>,
    capacity: NonZeroUsize,
}

impl<V: Clone> LruTtlCache<V> {
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            IpLocatorError::configuration("cache capacity must be a positive integer")
        })?;

        trace!("LruTtlCache initialized: capacity={}", capacity);

        Ok(Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
        })
    }

    /// 插入或覆盖，容量已满时淘汰最久未使用的条目
    pub fn insert(&self, key: &str, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };

        let mut guard = self.inner.lock();
        if let Some((evicted, _)) = guard.push(key.to_string(), entry)
            && evicted != key
        {
            trace!("Evicted least recently used key: {}", evicted);
        }
    }

    /// 读取未过期的值，命中或过期都会刷新 LRU 顺序
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let entry = guard.get(key)?;
        if entry.is_expired(now) {
            trace!("Cache entry expired: {}", key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// 是否仍持有该 key（忽略过期，不影响 LRU 顺序）
    pub fn contains_raw(&self, key: &str) -> bool {
        self.inner.lock().contains(key)
    }

    /// 移除所有已过期的条目，返回移除数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock();

        let expired: Vec<String> = guard
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            guard.pop(key);
        }

        if !expired.is_empty() {
            trace!("Purged {} expired cache entries", expired.len());
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}
