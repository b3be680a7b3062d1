use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cache::{LruTtlCache, spawn_purge_task};
use crate::config::{StaticConfig, validate_static_config};
use crate::limiter::build_rate_limiter;
use crate::services::{AdmissionGate, LookupService};
use crate::source::build_lookup_source;
use crate::utils::PeriodicTask;

/// 服务运行所需的全部组件
pub struct StartupContext {
    pub gate: AdmissionGate,
    pub lookup: Arc<LookupService>,
    /// 过期条目清扫任务，未配置 `cache.purge_interval_secs` 时为 `None`
    pub purge_task: Option<PeriodicTask>,
}

/// 准备服务器启动的上下文
///
/// 依次：验证配置、加载数据源、创建缓存、构造限流器。
/// 任何一步失败都终止启动（distributed 模式下共享存储不可达同样终止）。
pub async fn prepare_server_startup(config: &StaticConfig) -> Result<StartupContext> {
    let start_time = Instant::now();
    debug!("Starting pre-startup processing...");

    let validated = validate_static_config(config).context("Invalid configuration")?;

    let source = build_lookup_source(validated.source_kind, &config.source)
        .await
        .context("Failed to initialize lookup source")?;

    let cache = Arc::new(
        LruTtlCache::new(validated.cache.capacity).context("Failed to create lookup cache")?,
    );
    let purge_task = validated
        .cache
        .purge_interval
        .map(|interval| spawn_purge_task(&cache, interval));
    info!(
        "Lookup cache ready: capacity={}, ttl={:?}, purge={:?}",
        validated.cache.capacity, validated.cache.ttl, validated.cache.purge_interval
    );

    let limiter = build_rate_limiter(
        validated.limiter_kind,
        validated.limiter.clone(),
        &config.rate_limiter.redis,
    )
    .await
    .context("Failed to initialize rate limiter")?;

    let lookup = Arc::new(LookupService::new(
        source,
        cache,
        validated.cache.ttl,
        validated.source_timeout,
    ));

    info!(
        "Pre-startup completed in {} ms (limiter: {}, source: {})",
        start_time.elapsed().as_millis(),
        limiter.name(),
        lookup.source_name()
    );

    Ok(StartupContext {
        gate: AdmissionGate::new(limiter),
        lookup,
        purge_task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::IpLocatorError;

    fn disk_config(dir: &std::path::Path) -> StaticConfig {
        let mut config = StaticConfig::default();
        config.source.disk.path = dir.to_string_lossy().into_owned();
        config
    }

    #[tokio::test]
    async fn test_startup_with_local_limiter_and_disk_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"ip":"8.8.8.8","country":"US","city":"Mountain View"}]"#,
        )
        .unwrap();

        let mut config = disk_config(dir.path());
        config.cache.purge_interval_secs = 30;

        let ctx = prepare_server_startup(&config).await.unwrap();
        assert_eq!(ctx.gate.limiter_name(), "local");
        assert_eq!(ctx.lookup.source_name(), "disk");
        assert!(ctx.purge_task.is_some());
        assert_eq!(ctx.lookup.resolve("8.8.8.8").await.unwrap().country, "US");

        ctx.gate.shutdown().await;
    }

    #[tokio::test]
    async fn test_startup_rejects_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = disk_config(dir.path());
        config.cache.capacity = 0;

        let err = prepare_server_startup(&config).await.err().unwrap();
        let root = err.downcast_ref::<IpLocatorError>().unwrap();
        assert!(matches!(root, IpLocatorError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_startup_fails_when_shared_store_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = disk_config(dir.path());
        config.rate_limiter.kind = "distributed".to_string();
        config.rate_limiter.redis.url = "redis://127.0.0.1:1/".to_string();

        let err = prepare_server_startup(&config).await.err().unwrap();
        let root = err.downcast_ref::<IpLocatorError>().unwrap();
        assert!(matches!(root, IpLocatorError::BackendUnavailable(_)));
    }
}
