//! MaxMind GeoLite2 数据库数据源
//!
//! 使用本地 MaxMind GeoLite2-City.mmdb 文件进行 IP 地理位置查询

use std::net::IpAddr;

use async_trait::async_trait;
use maxminddb::Reader;
use tracing::{info, trace};

use super::{GeoRecord, LookupSource};
use crate::errors::{IpLocatorError, Result};

pub struct MaxMindSource {
    reader: Reader<Vec<u8>>,
}

impl MaxMindSource {
    /// 从文件路径打开数据库
    pub fn open(path: &str) -> Result<Self> {
        let reader = Reader::open_readfile(path).map_err(|e| {
            IpLocatorError::file_operation(format!(
                "Failed to open MaxMind database at {}: {}",
                path, e
            ))
        })?;
        info!("MaxMind database loaded from {}", path);
        Ok(Self { reader })
    }
}

#[async_trait]
impl LookupSource for MaxMindSource {
    async fn lookup(&self, ip: &str) -> Result<GeoRecord> {
        let ip_addr: IpAddr = ip
            .parse()
            .map_err(|_| IpLocatorError::validation(format!("Invalid IP address: {}", ip)))?;

        let result = self.reader.lookup(ip_addr)?;
        let Some(city) = result.decode::<maxminddb::geoip2::City>()? else {
            trace!("MaxMind has no record for {}", ip);
            return Ok(GeoRecord::default());
        };

        // country 使用 ISO 3166-1 alpha-2 代码，city 使用英文名
        let record = GeoRecord {
            country: city.country.iso_code.map(String::from).unwrap_or_default(),
            city: city.city.names.english.map(String::from).unwrap_or_default(),
        };

        trace!("MaxMind lookup for {}: {:?}", ip, record);
        Ok(record)
    }

    fn name(&self) -> &'static str {
        "maxmind"
    }
}
