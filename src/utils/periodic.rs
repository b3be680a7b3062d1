//! 可停止的周期性后台任务
//!
//! 用于限流器空闲桶回收与缓存过期条目清扫。
//! 任务在 `stop()` / `shutdown()` 或句柄被 drop 时退出。

use std::ops::ControlFlow;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

pub struct PeriodicTask {
    name: &'static str,
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PeriodicTask {
    /// 在当前 tokio 运行时上启动任务
    ///
    /// 第一次执行发生在一个 `period` 之后；`tick` 返回 `Break` 时任务自行结束。
    ///
    /// # Panics
    /// 在 tokio 运行时之外调用，或 `period` 为零时 panic
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval 的第一次 tick 立即完成
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        trace!("Periodic task '{}' tick", name);
                        if tick().is_break() {
                            break;
                        }
                    }
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            debug!("Periodic task '{}' stopped", name);
        });

        debug!("Periodic task '{}' started, period: {:?}", name, period);

        Self {
            name,
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// 发送停止信号，不等待任务退出
    fn stop(&self) {
        // 没有接收者说明任务已经结束
        let _ = self.stop_tx.send(true);
    }

    /// 发送停止信号并等待任务退出
    pub async fn shutdown(&self) {
        self.stop();
        let handle = self.handle.lock().take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            debug!("Periodic task '{}' join error: {}", self.name, e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_none_or(|handle| handle.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_ticks_every_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task = PeriodicTask::spawn("test", Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        tokio::time::sleep(Duration::from_millis(3_500)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        task.shutdown().await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_further_ticks() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task = PeriodicTask::spawn("test", Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        task.shutdown().await;
        let seen = counter.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_break_ends_task() {
        let task = PeriodicTask::spawn("test", Duration::from_secs(1), || ControlFlow::Break(()));
        tokio::time::sleep(Duration::from_millis(1_500)).await;
        tokio::task::yield_now().await;
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let task = PeriodicTask::spawn("test", Duration::from_secs(1), move || {
            c.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        });
        drop(task);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
