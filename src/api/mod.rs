//! HTTP 层
//!
//! - `/healthz`: 健康检查，不经过限流
//! - `/v1/*`: 查询接口，由 `AdmissionControl` 保护

pub mod middleware;
pub mod services;

use actix_web::{HttpResponse, http::StatusCode, web};

use middleware::AdmissionControl;
use services::{health_routes, lookup_routes};

/// 统一错误响应体 `{"error": "<message>"}`
pub fn error_response(status: StatusCode, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({ "error": message }))
}

/// 注册全部路由
pub fn configure(cfg: &mut web::ServiceConfig, admission: AdmissionControl) {
    cfg.service(web::scope("/healthz").service(health_routes()))
        .service(
            web::scope("/v1")
                .wrap(admission)
                .service(lookup_routes()),
        );
}
