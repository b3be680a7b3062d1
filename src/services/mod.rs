//! 业务服务层
//!
//! 请求路径上的两个核心组件：准入（限流）与查询（缓存 + 数据源）。

mod admission;
mod lookup;

pub use admission::AdmissionGate;
pub use lookup::LookupService;
