//! 请求准入
//!
//! 包装启动时选定的唯一一个限流器，供中间件在请求进入查询服务前调用。

use std::sync::Arc;

use tracing::debug;

use crate::limiter::RateLimiter;

#[derive(Clone)]
pub struct AdmissionGate {
    limiter: Arc<dyn RateLimiter>,
}

impl AdmissionGate {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self { limiter }
    }

    pub async fn allow(&self, client_id: &str) -> bool {
        let admitted = self.limiter.allow(client_id).await;
        if !admitted {
            debug!("Admission denied for {} by {} limiter", client_id, self.limiter.name());
        }
        admitted
    }

    pub fn limiter_name(&self) -> &'static str {
        self.limiter.name()
    }

    /// 停止限流器的后台任务
    pub async fn shutdown(&self) {
        self.limiter.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{LocalRateLimiter, test_settings};
    use std::time::Duration;

    #[tokio::test]
    async fn test_gate_delegates_to_limiter() {
        let limiter = Arc::new(LocalRateLimiter::new(test_settings(
            10,
            2,
            Duration::from_secs(60),
        )));
        let gate = AdmissionGate::new(limiter);

        assert_eq!(gate.limiter_name(), "local");
        assert!(gate.allow("a").await);
        assert!(gate.allow("a").await);
        assert!(!gate.allow("a").await);
        assert!(gate.allow("b").await);

        gate.shutdown().await;
    }
}
