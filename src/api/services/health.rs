use actix_web::{HttpResponse, Responder, web};
use serde::Serialize;
use tracing::trace;

use crate::services::{AdmissionGate, LookupService};

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

impl AppStartTime {
    pub fn now() -> Self {
        Self {
            start_datetime: chrono::Utc::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        let elapsed = chrono::Utc::now() - self.start_datetime;
        u64::try_from(elapsed.num_seconds()).unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
    pub limiter: &'static str,
    pub source: &'static str,
    pub cache_entries: usize,
    pub cache_capacity: usize,
}

/// Health Service
///
/// 只报告进程内状态，不访问数据源或共享存储，也不经过限流。
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        gate: web::Data<AdmissionGate>,
        lookup: web::Data<LookupService>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        trace!("Received health check request");

        let cache = lookup.cache();
        HttpResponse::Ok().json(HealthResponse {
            status: "ok",
            uptime_secs: app_start_time.uptime_secs(),
            limiter: gate.limiter_name(),
            source: lookup.source_name(),
            cache_entries: cache.len(),
            cache_capacity: cache.capacity(),
        })
    }
}

pub fn health_routes() -> actix_web::Scope {
    web::scope("")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
}
