use actix_web::{HttpResponse, http::StatusCode, web};
use serde::Deserialize;
use tracing::{debug, trace};

use crate::api::error_response;
use crate::errors::IpLocatorError;
use crate::services::LookupService;
use crate::utils::ip::parse_ip;

#[derive(Debug, Deserialize)]
pub struct FindCountryQuery {
    pub ip: Option<String>,
}

pub struct FindCountryService;

impl FindCountryService {
    /// `GET /v1/find-country?ip=<ip>`
    pub async fn find_country(
        query: web::Query<FindCountryQuery>,
        lookup: web::Data<LookupService>,
    ) -> HttpResponse {
        let Some(raw) = query.ip.as_deref().filter(|s| !s.trim().is_empty()) else {
            return error_response(StatusCode::BAD_REQUEST, "missing ip parameter");
        };
        let Some(ip) = parse_ip(raw) else {
            debug!("Rejected malformed ip parameter: {}", raw);
            return error_response(StatusCode::BAD_REQUEST, "invalid ip address");
        };

        // 规范化后作为缓存 key，保证同一地址的不同写法命中同一条目
        let key = ip.to_string();
        match lookup.resolve(&key).await {
            Ok(record) if record.is_empty() => {
                trace!("No location found for {}", key);
                error_response(StatusCode::NOT_FOUND, "not found")
            }
            Ok(record) => HttpResponse::Ok().json(record),
            Err(IpLocatorError::Validation(msg)) => error_response(StatusCode::BAD_REQUEST, &msg),
            Err(_) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed"),
        }
    }
}

pub fn lookup_routes() -> actix_web::Scope {
    web::scope("").route("/find-country", web::get().to(FindCountryService::find_country))
}
