use std::time::Duration;

use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::startup::StartupContext;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

/// 等待 Ctrl+C 信号，然后在超时内停止后台任务
pub async fn listen_for_shutdown(ctx: &StartupContext) {
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, stopping background tasks...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    let shutdown_result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(ctx),
    )
    .await;

    match shutdown_result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}

/// 按顺序停止：限流器回收任务，缓存清扫任务
pub async fn perform_shutdown_tasks(ctx: &StartupContext) {
    let task_timeout = Duration::from_secs(TASK_TIMEOUT_SECS);

    match timeout(task_timeout, ctx.gate.shutdown()).await {
        Ok(()) => info!("Rate limiter ({}) stopped", ctx.gate.limiter_name()),
        Err(_) => error!(
            "Rate limiter shutdown timed out after {} seconds",
            TASK_TIMEOUT_SECS
        ),
    }

    if let Some(task) = &ctx.purge_task {
        match timeout(task_timeout, task.shutdown()).await {
            Ok(()) => info!("Cache purge task stopped"),
            Err(_) => error!(
                "Cache purge task shutdown timed out after {} seconds",
                TASK_TIMEOUT_SECS
            ),
        }
    }
}
