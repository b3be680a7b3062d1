//! 配置值验证模块
//!
//! 把原始的 `StaticConfig` 转换为各组件使用的强类型设置，
//! 任何非法值都以 `IpLocatorError::Configuration` 返回，启动阶段即失败。

use std::str::FromStr;
use std::time::Duration;

use super::StaticConfig;
use crate::cache::CacheSettings;
use crate::errors::{IpLocatorError, Result};
use crate::limiter::{LimiterKind, LimiterSettings};
use crate::source::SourceKind;

/// 验证通过的配置
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub cache: CacheSettings,
    pub limiter_kind: LimiterKind,
    pub limiter: LimiterSettings,
    pub source_kind: SourceKind,
    pub source_timeout: Duration,
}

pub fn validate_static_config(config: &StaticConfig) -> Result<ValidatedConfig> {
    if config.cache.capacity == 0 {
        return Err(IpLocatorError::configuration(
            "cache.capacity must be a positive integer",
        ));
    }
    if config.cache.ttl_secs == 0 {
        return Err(IpLocatorError::configuration(
            "cache.ttl_secs must be greater than zero",
        ));
    }

    let rl = &config.rate_limiter;
    let limiter_kind = LimiterKind::from_str(&rl.kind).map_err(|_| {
        IpLocatorError::configuration(format!(
            "Unknown rate_limiter.kind '{}'. Valid: local, distributed",
            rl.kind
        ))
    })?;

    require_positive("rate_limiter.global_capacity", rl.global_capacity as u64)?;
    require_positive("rate_limiter.client_capacity", rl.client_capacity as u64)?;
    require_positive("rate_limiter.refill_interval_ms", rl.refill_interval_ms)?;
    require_positive("rate_limiter.store_timeout_ms", rl.store_timeout_ms)?;
    if limiter_kind == LimiterKind::Local {
        require_positive("rate_limiter.cleanup_interval_ms", rl.cleanup_interval_ms)?;
        require_positive("rate_limiter.bucket_idle_ttl_ms", rl.bucket_idle_ttl_ms)?;
    }

    let source_kind = SourceKind::from_str(&config.source.kind).map_err(|_| {
        IpLocatorError::configuration(format!(
            "Unknown source.kind '{}'. Valid: disk, maxmind, mongo",
            config.source.kind
        ))
    })?;
    require_positive("source.timeout_ms", config.source.timeout_ms)?;

    Ok(ValidatedConfig {
        cache: CacheSettings {
            capacity: config.cache.capacity,
            ttl: Duration::from_secs(config.cache.ttl_secs),
            purge_interval: (config.cache.purge_interval_secs > 0)
                .then(|| Duration::from_secs(config.cache.purge_interval_secs)),
        },
        limiter_kind,
        limiter: LimiterSettings {
            global_capacity: rl.global_capacity,
            client_capacity: rl.client_capacity,
            refill_interval: Duration::from_millis(rl.refill_interval_ms),
            bucket_idle_ttl: Duration::from_millis(rl.bucket_idle_ttl_ms),
            cleanup_interval: Duration::from_millis(rl.cleanup_interval_ms),
            store_timeout: Duration::from_millis(rl.store_timeout_ms),
            refund_on_deny: rl.refund_on_deny,
        },
        source_kind,
        source_timeout: Duration::from_millis(config.source.timeout_ms),
    })
}

fn require_positive(key: &str, value: u64) -> Result<()> {
    if value == 0 {
        return Err(IpLocatorError::configuration(format!(
            "{} must be greater than zero",
            key
        )));
    }
    Ok(())
}
