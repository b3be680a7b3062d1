//! 本地 JSON 目录数据源
//!
//! 递归遍历目录下所有 `*.json` 文件，每个文件是 `{ip, country, city}` 数组。
//! 同一 IP 出现多次时，按路径排序后靠后的文件覆盖靠前的。

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, trace};

use super::{GeoRecord, LookupSource};
use crate::errors::{IpLocatorError, Result};
use crate::utils::ip::normalize_ip;

#[derive(Debug, Deserialize)]
struct DiskRecord {
    ip: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    city: String,
}

pub struct DiskSource {
    records: HashMap<String, GeoRecord>,
}

impl DiskSource {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let root = path.as_ref();
        if !root.exists() {
            return Err(IpLocatorError::file_operation(format!(
                "Disk source path does not exist: {}",
                root.display()
            )));
        }

        let mut files = Vec::new();
        collect_json_files(root, &mut files)?;
        files.sort();

        let mut records = HashMap::new();
        for file in &files {
            let content = fs::read_to_string(file).map_err(|e| {
                IpLocatorError::file_operation(format!("Failed to read {}: {}", file.display(), e))
            })?;
            let entries: Vec<DiskRecord> = serde_json::from_str(&content).map_err(|e| {
                IpLocatorError::serialization(format!(
                    "Failed to parse {}: {}",
                    file.display(),
                    e
                ))
            })?;

            debug!("Loaded {} records from {}", entries.len(), file.display());
            for entry in entries {
                records.insert(
                    normalize_ip(&entry.ip),
                    GeoRecord::new(entry.country, entry.city),
                );
            }
        }

        info!(
            "Disk source loaded {} records from {} file(s) under {}",
            records.len(),
            files.len(),
            root.display()
        );

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn collect_json_files(path: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    if path.is_file() {
        if path.extension().is_some_and(|ext| ext == "json") {
            out.push(path.to_path_buf());
        }
        return Ok(());
    }

    for entry in fs::read_dir(path)? {
        let entry = entry?;
        collect_json_files(&entry.path(), out)?;
    }
    Ok(())
}

#[async_trait]
impl LookupSource for DiskSource {
    async fn lookup(&self, ip: &str) -> Result<GeoRecord> {
        let record = self.records.get(&normalize_ip(ip)).cloned();
        trace!("Disk lookup for {}: {:?}", ip, record);
        Ok(record.unwrap_or_default())
    }

    fn name(&self) -> &'static str {
        "disk"
    }
}
