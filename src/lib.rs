//! iplocator - IP to country/city lookup service
//!
//! 查询路径：准入限流 -> 缓存 -> 数据源。
//!
//! # Features
//! - **maxmind**: MaxMind GeoLite2-City 数据源（默认开启）
//!
//! # Architecture
//! - `cache`: 带 TTL 的 LRU 缓存
//! - `limiter`: 本地 / 分布式双作用域限流器
//! - `source`: 地理位置数据源（disk / maxmind）
//! - `services`: 准入与查询服务
//! - `api`: HTTP handler 与中间件
//! - `config`: 配置加载与验证
//! - `runtime`: 启动、运行与关闭
//! - `system`: 日志等系统级功能

pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod runtime;
pub mod services;
pub mod source;
pub mod system;
pub mod utils;
