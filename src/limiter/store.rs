use std::time::Duration;

use async_trait::async_trait;

use crate::errors::Result;

/// 共享计数存储（分布式限流的后端）
///
/// 所有操作都必须是原子的；任何错误都会被调用方视为拒绝。
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 自增并返回新值，key 不存在时从 0 开始
    async fn incr(&self, key: &str) -> Result<i64>;

    /// 自减并返回新值
    async fn decr(&self, key: &str) -> Result<i64>;

    /// key 存在但没有过期时间时设置过期时间，返回是否设置成功
    ///
    /// 每次自增后都会调用；已有过期时间的 key 保持不变。
    async fn expire_if_unset(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// 存储名称（用于日志）
    fn name(&self) -> &'static str;
}
