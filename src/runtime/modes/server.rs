//! Server mode
//!
//! 组装组件、注册路由并启动 HTTP 服务器，收到 Ctrl+C 后按顺序优雅关闭。

use std::time::Duration;

use actix_web::{App, HttpServer, middleware::from_fn, web};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::{self, middleware::AdmissionControl, middleware::assign_request_id};
use crate::api::services::AppStartTime;
use crate::config::StaticConfig;
use crate::runtime::lifetime;

/// HTTP 服务器等待在途请求完成的最长时间（秒）
const SERVER_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

/// Run the HTTP server
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(config: &StaticConfig) -> Result<()> {
    let app_start_time = AppStartTime::now();

    let startup = lifetime::prepare_server_startup(config)
        .await
        .inspect_err(|e| tracing::error!("Server startup failed: {:#}", e))?;

    let gate = startup.gate.clone();
    let lookup = web::Data::from(startup.lookup.clone());
    let trusted_proxies = config.server.trusted_proxies.clone();

    if trusted_proxies.is_empty() {
        info!("No trusted proxies configured, rate limiting by peer address");
    } else {
        warn!(
            "Trusted proxies configured, X-Forwarded-For honored from: {:?}",
            trusted_proxies
        );
    }

    let cpu_count = config.server.cpu_count.clamp(1, 32);
    info!("Using {} CPU cores for the server", cpu_count);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);

    let server = HttpServer::new(move || {
        let admission = AdmissionControl::new(trusted_proxies.clone());
        App::new()
            .wrap(from_fn(assign_request_id))
            .app_data(web::Data::new(gate.clone()))
            .app_data(lookup.clone())
            .app_data(web::Data::new(app_start_time.clone()))
            .configure(|cfg| api::configure(cfg, admission))
    })
    .keep_alive(Duration::from_secs(30))
    .client_request_timeout(Duration::from_millis(5000))
    .client_disconnect_timeout(Duration::from_millis(1000))
    .shutdown_timeout(SERVER_SHUTDOWN_TIMEOUT_SECS)
    .disable_signals()
    .workers(cpu_count)
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {}", bind_address))?
    .run();

    warn!("Starting server at http://{}", bind_address);

    let handle = server.handle();
    let mut server_task = actix_web::rt::spawn(server);

    tokio::select! {
        res = &mut server_task => {
            res.context("HTTP server task aborted")?
                .context("HTTP server exited with error")?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&startup) => {
            handle.stop(true).await;
            if let Err(e) = server_task.await {
                warn!("HTTP server task join error: {}", e);
            }
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
