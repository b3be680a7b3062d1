//! 准入限流
//!
//! 两种固定窗口、双作用域（全局 + 单客户端）的限流实现：
//! - `LocalRateLimiter`: 进程内状态，后台任务回收空闲桶
//! - `DistributedRateLimiter`: 基于共享计数存储（Redis），多实例共享同一配额
//!
//! 启动时根据配置选择其一，以 `Arc<dyn RateLimiter>` 注入请求路径。

mod distributed;
mod local;
mod redis_store;
mod store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strum::{AsRefStr, Display, EnumString};
use tracing::info;

use crate::config::RedisConfig;
use crate::errors::Result;

pub use distributed::DistributedRateLimiter;
pub use local::LocalRateLimiter;
pub use redis_store::RedisCounterStore;
pub use store::CounterStore;

/// 限流器类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LimiterKind {
    Local,
    Distributed,
}

/// 限流设置（由配置验证得到）
#[derive(Debug, Clone)]
pub struct LimiterSettings {
    pub global_capacity: u32,
    pub client_capacity: u32,
    /// 窗口长度，到期后整桶重置
    pub refill_interval: Duration,
    /// 客户端桶空闲超过该时长后被回收（仅 local）
    pub bucket_idle_ttl: Duration,
    /// 回收任务执行间隔（仅 local）
    pub cleanup_interval: Duration,
    /// 单次共享存储调用超时（仅 distributed）
    pub store_timeout: Duration,
    /// 拒绝时归还计数（仅 distributed）
    pub refund_on_deny: bool,
}

#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// 是否放行来自 `client_id` 的请求
    async fn allow(&self, client_id: &str) -> bool;

    /// 限流器名称（用于日志与健康检查）
    fn name(&self) -> &'static str;

    /// 停止后台任务
    async fn shutdown(&self) {}
}

/// 根据类型构造限流器
///
/// distributed 模式在构造时会 PING 共享存储，不可达时返回 `BackendUnavailable`。
pub async fn build_rate_limiter(
    kind: LimiterKind,
    settings: LimiterSettings,
    redis: &RedisConfig,
) -> Result<Arc<dyn RateLimiter>> {
    let limiter: Arc<dyn RateLimiter> = match kind {
        LimiterKind::Local => Arc::new(LocalRateLimiter::new(settings)),
        LimiterKind::Distributed => {
            let store = RedisCounterStore::connect(&redis.url).await?;
            Arc::new(DistributedRateLimiter::new(
                Arc::new(store),
                &redis.key_prefix,
                settings,
            ))
        }
    };

    info!("Rate limiter initialized: {}", limiter.name());
    Ok(limiter)
}

#[cfg(test)]
pub(crate) fn test_settings(global: u32, client: u32, refill: Duration) -> LimiterSettings {
    LimiterSettings {
        global_capacity: global,
        client_capacity: client,
        refill_interval: refill,
        bucket_idle_ttl: Duration::from_secs(5),
        cleanup_interval: Duration::from_secs(10),
        store_timeout: Duration::from_millis(500),
        refund_on_deny: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_limiter_kind_parsing() {
        assert_eq!(LimiterKind::from_str("local").unwrap(), LimiterKind::Local);
        assert_eq!(
            LimiterKind::from_str("DISTRIBUTED").unwrap(),
            LimiterKind::Distributed
        );
        assert!(LimiterKind::from_str("token-bucket").is_err());
        assert_eq!(LimiterKind::Distributed.to_string(), "distributed");
    }

    #[tokio::test]
    async fn test_build_local_limiter() {
        let limiter = build_rate_limiter(
            LimiterKind::Local,
            test_settings(10, 5, Duration::from_secs(1)),
            &RedisConfig::default(),
        )
        .await
        .unwrap();

        assert_eq!(limiter.name(), "local");
        assert!(limiter.allow("10.0.0.1").await);
        limiter.shutdown().await;
    }

    #[tokio::test]
    async fn test_build_distributed_limiter_unreachable_store_fails() {
        let redis = RedisConfig {
            // 保留端口，连接必然失败
            url: "redis://127.0.0.1:1/".to_string(),
            key_prefix: "rate_limiter:".to_string(),
        };
        let result = build_rate_limiter(
            LimiterKind::Distributed,
            test_settings(10, 5, Duration::from_secs(1)),
            &redis,
        )
        .await;

        assert!(matches!(
            result,
            Err(crate::errors::IpLocatorError::BackendUnavailable(_))
        ));
    }
}
