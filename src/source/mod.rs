//! 地理位置数据源
//!
//! 统一的查询接口，根据配置选择实现：
//! - disk: 本地 JSON 目录（启动时全部加载到内存）
//! - maxmind: MaxMind GeoLite2-City 数据库
//! - mongo: MongoDB 集合，逐次查询

mod disk;
#[cfg(feature = "maxmind")]
mod maxmind;
#[cfg(feature = "mongo")]
mod mongo;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;

use crate::config::SourceConfig;
use crate::errors::Result;

pub use disk::DiskSource;
#[cfg(feature = "maxmind")]
pub use maxmind::MaxMindSource;
#[cfg(feature = "mongo")]
pub use mongo::MongoSource;

/// 查询结果，两个字段都为空表示未找到
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoRecord {
    pub country: String,
    pub city: String,
}

impl GeoRecord {
    pub fn new(country: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            city: city.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.country.is_empty() && self.city.is_empty()
    }
}

/// 数据源查询 trait
#[async_trait]
pub trait LookupSource: Send + Sync {
    /// 查询 IP 的地理位置
    ///
    /// 未找到时返回空的 `GeoRecord`，只有数据源故障才返回错误。
    async fn lookup(&self, ip: &str) -> Result<GeoRecord>;

    /// 数据源名称（用于日志与健康检查）
    fn name(&self) -> &'static str;
}

/// 数据源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SourceKind {
    Disk,
    #[strum(serialize = "maxmind")]
    MaxMind,
    Mongo,
}

/// 根据类型构造数据源
pub async fn build_lookup_source(
    kind: SourceKind,
    config: &SourceConfig,
) -> Result<Arc<dyn LookupSource>> {
    let source: Arc<dyn LookupSource> = match kind {
        SourceKind::Disk => Arc::new(DiskSource::load(&config.disk.path)?),
        #[cfg(feature = "maxmind")]
        SourceKind::MaxMind => Arc::new(MaxMindSource::open(&config.maxmind.path)?),
        #[cfg(not(feature = "maxmind"))]
        SourceKind::MaxMind => {
            return Err(crate::errors::IpLocatorError::configuration(
                "source.kind 'maxmind' requires the `maxmind` feature",
            ));
        }
        #[cfg(feature = "mongo")]
        SourceKind::Mongo => Arc::new(MongoSource::connect(&config.mongo).await?),
        #[cfg(not(feature = "mongo"))]
        SourceKind::Mongo => {
            return Err(crate::errors::IpLocatorError::configuration(
                "source.kind 'mongo' requires the `mongo` feature",
            ));
        }
    };

    info!("Lookup source initialized: {}", source.name());
    Ok(source)
}
