//! MongoDB 数据源
//!
//! 每次查询按 `ip` 字段在集合中查找一条 `{ip, country, city}` 文档。

use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::{Client, Collection};
use serde::Deserialize;
use tracing::{info, trace};

use super::{GeoRecord, LookupSource};
use crate::config::MongoSourceConfig;
use crate::errors::{IpLocatorError, Result};

#[derive(Debug, Deserialize)]
struct LocationDocument {
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
}

pub struct MongoSource {
    collection: Collection<LocationDocument>,
}

impl MongoSource {
    /// 解析 URI 并创建客户端，连接在第一次查询时建立
    pub async fn connect(config: &MongoSourceConfig) -> Result<Self> {
        let client = Client::with_uri_str(&config.uri).await.map_err(|e| {
            IpLocatorError::configuration(format!(
                "Invalid MongoDB URI '{}': {}",
                config.uri, e
            ))
        })?;

        info!(
            "MongoDB source ready: {}.{}",
            config.database, config.collection
        );
        Ok(Self {
            collection: client
                .database(&config.database)
                .collection(&config.collection),
        })
    }
}

#[async_trait]
impl LookupSource for MongoSource {
    async fn lookup(&self, ip: &str) -> Result<GeoRecord> {
        let found = self
            .collection
            .find_one(doc! { "ip": ip })
            .await
            .map_err(|e| {
                IpLocatorError::lookup_source(format!("MongoDB query for {} failed: {}", ip, e))
            })?;

        match found {
            Some(document) => Ok(GeoRecord::new(document.country, document.city)),
            None => {
                trace!("MongoDB has no document for {}", ip);
                Ok(GeoRecord::default())
            }
        }
    }

    fn name(&self) -> &'static str {
        "mongo"
    }
}
