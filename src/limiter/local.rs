use std::collections::HashMap;
use std::ops::ControlFlow;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use super::{LimiterSettings, RateLimiter};
use crate::utils::periodic::PeriodicTask;

/// 单个固定窗口
#[derive(Debug, Clone)]
struct Bucket {
    capacity: u32,
    remaining: u32,
    last_refill: Instant,
}

impl Bucket {
    fn full(capacity: u32, now: Instant) -> Self {
        Self {
            capacity,
            remaining: capacity,
            last_refill: now,
        }
    }

    /// 窗口到期则整桶重置（不是按时间逐步补充）
    fn refill_if_due(&mut self, now: Instant, interval: Duration) {
        if now.saturating_duration_since(self.last_refill) >= interval {
            self.remaining = self.capacity;
            self.last_refill = now;
        }
    }
}

struct LimiterState {
    global: Bucket,
    clients: HashMap<String, Bucket>,
}

impl LimiterState {
    /// 删除 `last_refill` 早于 `idle_ttl` 的客户端桶
    fn sweep_idle(&mut self, now: Instant, idle_ttl: Duration) -> usize {
        let before = self.clients.len();
        self.clients
            .retain(|_, bucket| now.saturating_duration_since(bucket.last_refill) <= idle_ttl);
        before - self.clients.len()
    }
}

/// 进程内双桶限流器
///
/// 所有桶的读写（包括后台回收）都在同一把锁内完成，
/// 放行时两个桶同时扣减，不会出现只扣其一的情况。
pub struct LocalRateLimiter {
    state: Arc<Mutex<LimiterState>>,
    settings: LimiterSettings,
    cleaner: PeriodicTask,
}

impl LocalRateLimiter {
    /// 创建限流器并启动空闲桶回收任务
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn new(settings: LimiterSettings) -> Self {
        if settings.bucket_idle_ttl < settings.refill_interval {
            warn!(
                "bucket_idle_ttl ({:?}) is shorter than refill_interval ({:?}); \
                 exhausted clients may be reclaimed before their window ends",
                settings.bucket_idle_ttl, settings.refill_interval
            );
        }

        let state = Arc::new(Mutex::new(LimiterState {
            global: Bucket::full(settings.global_capacity, Instant::now()),
            clients: HashMap::new(),
        }));

        let cleaner = Self::spawn_cleaner(
            Arc::downgrade(&state),
            settings.cleanup_interval,
            settings.bucket_idle_ttl,
        );

        debug!(
            "LocalRateLimiter created: global={}, client={}, window={:?}",
            settings.global_capacity, settings.client_capacity, settings.refill_interval
        );

        Self {
            state,
            settings,
            cleaner,
        }
    }

    fn spawn_cleaner(
        state: Weak<Mutex<LimiterState>>,
        interval: Duration,
        idle_ttl: Duration,
    ) -> PeriodicTask {
        PeriodicTask::spawn("rate-limiter-cleanup", interval, move || {
            let Some(state) = state.upgrade() else {
                return ControlFlow::Break(());
            };
            let removed = state.lock().sweep_idle(Instant::now(), idle_ttl);
            if removed > 0 {
                debug!("Reclaimed {} idle client buckets", removed);
            }
            ControlFlow::Continue(())
        })
    }

    /// 同步判定并扣减
    fn try_acquire(&self, client_id: &str) -> bool {
        let now = Instant::now();
        let interval = self.settings.refill_interval;
        let client_capacity = self.settings.client_capacity;

        let mut guard = self.state.lock();
        let LimiterState { global, clients } = &mut *guard;

        let client = clients
            .entry(client_id.to_string())
            .or_insert_with(|| Bucket::full(client_capacity, now));

        client.refill_if_due(now, interval);
        global.refill_if_due(now, interval);

        if client.remaining > 0 && global.remaining > 0 {
            client.remaining -= 1;
            global.remaining -= 1;
            trace!(
                "Admitted {}: client remaining={}, global remaining={}",
                client_id, client.remaining, global.remaining
            );
            true
        } else {
            debug!(
                "Rate limited {}: client remaining={}, global remaining={}",
                client_id, client.remaining, global.remaining
            );
            false
        }
    }

    /// 立即执行一次空闲桶回收，返回回收数量
    pub fn sweep_idle(&self) -> usize {
        self.state
            .lock()
            .sweep_idle(Instant::now(), self.settings.bucket_idle_ttl)
    }

    /// 当前持有的客户端桶数量
    pub fn tracked_clients(&self) -> usize {
        self.state.lock().clients.len()
    }

    pub fn is_tracking(&self, client_id: &str) -> bool {
        self.state.lock().clients.contains_key(client_id)
    }

    pub fn global_remaining(&self) -> u32 {
        self.state.lock().global.remaining
    }
}

#[async_trait]
impl RateLimiter for LocalRateLimiter {
    async fn allow(&self, client_id: &str) -> bool {
        self.try_acquire(client_id)
    }

    fn name(&self) -> &'static str {
        "local"
    }

    async fn shutdown(&self) {
        self.cleaner.shutdown().await;
        debug!("LocalRateLimiter cleanup task stopped");
    }
}
