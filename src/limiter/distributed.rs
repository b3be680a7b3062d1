use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace, warn};

use super::{CounterStore, LimiterSettings, RateLimiter};
use crate::errors::{IpLocatorError, Result};

/// 基于共享计数存储的双作用域限流器
///
/// 每个窗口内先自增再判定，因此被拒绝的请求默认也会占用一次计数；
/// `refund_on_deny` 打开时在拒绝后把两个计数各减一。
/// 与存储的任何通信失败都按拒绝处理（fail-closed）。
pub struct DistributedRateLimiter {
    store: Arc<dyn CounterStore>,
    global_key: String,
    client_key_prefix: String,
    settings: LimiterSettings,
}

impl DistributedRateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, key_prefix: &str, settings: LimiterSettings) -> Self {
        debug!(
            "DistributedRateLimiter created on {} store: prefix='{}', global={}, client={}, window={:?}",
            store.name(),
            key_prefix,
            settings.global_capacity,
            settings.client_capacity,
            settings.refill_interval
        );

        Self {
            store,
            global_key: format!("{}global", key_prefix),
            client_key_prefix: format!("{}client:", key_prefix),
            settings,
        }
    }

    pub fn global_key(&self) -> &str {
        &self.global_key
    }

    pub fn client_key(&self, client_id: &str) -> String {
        format!("{}{}", self.client_key_prefix, client_id)
    }

    /// 判定是否放行；存储错误以 `Err` 返回
    pub async fn try_allow(&self, client_id: &str) -> Result<bool> {
        let client_key = self.client_key(client_id);
        trace!(
            "Rate limiting keys: global={}, client={}",
            self.global_key, client_key
        );

        let global_count = self.bump(&self.global_key).await?;
        let client_count = self.bump(&client_key).await?;

        let admitted = global_count <= i64::from(self.settings.global_capacity)
            && client_count <= i64::from(self.settings.client_capacity);

        if !admitted {
            debug!(
                "Rate limited {}: global={}/{}, client={}/{}",
                client_id,
                global_count,
                self.settings.global_capacity,
                client_count,
                self.settings.client_capacity
            );
            if self.settings.refund_on_deny {
                self.refund(&client_key).await;
            }
        }

        Ok(admitted)
    }

    /// 自增计数并补齐过期时间
    ///
    /// 每次自增后都执行 set-if-unset：第一次设置失败的 key 会在下一次自增时补上，
    /// 不会留下永不过期的计数。
    async fn bump(&self, key: &str) -> Result<i64> {
        let count = self.bounded(self.store.incr(key)).await?;
        let window = self.settings.refill_interval;
        let applied = self
            .bounded(self.store.expire_if_unset(key, window))
            .await?;
        if applied && count > 1 {
            warn!(
                "Counter '{}' had no expiry at count {}, window restored",
                key, count
            );
        }
        Ok(count)
    }

    async fn refund(&self, client_key: &str) {
        for key in [self.global_key.as_str(), client_key] {
            if let Err(e) = self.bounded(self.store.decr(key)).await {
                warn!("Failed to refund rate limit counter '{}': {}", key, e);
            }
        }
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.settings.store_timeout, call)
            .await
            .map_err(|_| {
                IpLocatorError::backend_unavailable(format!(
                    "{} store call timed out after {:?}",
                    self.store.name(),
                    self.settings.store_timeout
                ))
            })?
    }
}

#[async_trait]
impl RateLimiter for DistributedRateLimiter {
    async fn allow(&self, client_id: &str) -> bool {
        match self.try_allow(client_id).await {
            Ok(admitted) => admitted,
            Err(e) => {
                warn!("Rate limiter store failure, denying {}: {}", client_id, e);
                false
            }
        }
    }

    fn name(&self) -> &'static str {
        "distributed"
    }
}
