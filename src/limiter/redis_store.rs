use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Cmd, FromRedisValue};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use super::CounterStore;
use crate::errors::{IpLocatorError, Result};

/// PTTL 为 -1 表示 key 存在但没有过期时间（PEXPIRE NX 需要 Redis 7，这里兼容旧版本）
const EXPIRE_IF_UNSET_SCRIPT: &str = r#"
if redis.call('PTTL', KEYS[1]) == -1 then
    return redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
return 0
"#;

pub struct RedisCounterStore {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: RwLock<Option<MultiplexedConnection>>,
}

impl RedisCounterStore {
    /// 创建客户端并 PING 一次，不可达时返回 `BackendUnavailable`
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(|e| {
            IpLocatorError::configuration(format!("Invalid Redis URL '{}': {}", url, e))
        })?;

        let store = Self {
            client,
            connection: RwLock::new(None),
        };

        match store.ping().await {
            Ok(response) => {
                info!("Redis counter store connected ({}): {}", url, response);
                Ok(store)
            }
            Err(e) => {
                error!(
                    "Failed to ping Redis server: {}. Check Redis server status and URL: {}",
                    e, url
                );
                Err(IpLocatorError::backend_unavailable(format!(
                    "Redis ping failed: {}",
                    e.message()
                )))
            }
        }
    }

    pub async fn ping(&self) -> Result<String> {
        self.query(redis::cmd("PING")).await
    }

    /// 获取或建立持久连接
    async fn get_connection(&self) -> std::result::Result<MultiplexedConnection, redis::RedisError> {
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    async fn query<T: FromRedisValue>(&self, cmd: Cmd) -> Result<T> {
        let mut conn = match self.get_connection().await {
            Ok(c) => c,
            Err(e) => {
                self.reset_connection().await;
                return Err(e.into());
            }
        };

        match cmd.query_async::<T>(&mut conn).await {
            Ok(value) => Ok(value),
            Err(e) => {
                // 连接可能已断开，重置连接
                self.reset_connection().await;
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("INCR");
        cmd.arg(key);
        self.query(cmd).await
    }

    async fn decr(&self, key: &str) -> Result<i64> {
        let mut cmd = redis::cmd("DECR");
        cmd.arg(key);
        self.query(cmd).await
    }

    async fn expire_if_unset(&self, key: &str, ttl: Duration) -> Result<bool> {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX).max(1);
        let mut cmd = redis::cmd("EVAL");
        cmd.arg(EXPIRE_IF_UNSET_SCRIPT).arg(1).arg(key).arg(millis);
        let applied: i64 = self.query(cmd).await?;
        Ok(applied == 1)
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
