//! 准入控制中间件
//!
//! 在请求进入查询 handler 之前向 `AdmissionGate` 申请配额，被拒绝时直接返回 429。

use actix_service::{Service, Transform};
use actix_web::{
    Error,
    body::EitherBody,
    dev::{ServiceRequest, ServiceResponse},
    http::StatusCode,
    web,
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{error, trace};

use crate::api::error_response;
use crate::services::AdmissionGate;
use crate::utils::ip::client_id_for;

pub const RATE_LIMITED_MESSAGE: &str = "rate limit exceeded";

/// 准入控制中间件工厂
///
/// `trusted_proxies` 中的对端可以通过 X-Forwarded-For / X-Real-IP 指定客户端标识。
#[derive(Clone, Default)]
pub struct AdmissionControl {
    trusted_proxies: Arc<[String]>,
}

impl AdmissionControl {
    pub fn new(trusted_proxies: Vec<String>) -> Self {
        Self {
            trusted_proxies: trusted_proxies.into(),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionControl
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdmissionControlMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionControlMiddleware {
            service: Rc::new(service),
            trusted_proxies: Arc::clone(&self.trusted_proxies),
        }))
    }
}

pub struct AdmissionControlMiddleware<S> {
    service: Rc<S>,
    trusted_proxies: Arc<[String]>,
}

impl<S, B> Service<ServiceRequest> for AdmissionControlMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let gate = req.app_data::<web::Data<AdmissionGate>>().cloned();
        let client_id = client_id_for(&req, &self.trusted_proxies);

        Box::pin(async move {
            let Some(gate) = gate else {
                error!("AdmissionGate is not registered, rejecting request");
                return Ok(req.into_response(
                    error_response(StatusCode::SERVICE_UNAVAILABLE, "admission unavailable")
                        .map_into_right_body(),
                ));
            };

            if !gate.allow(&client_id).await {
                return Ok(req.into_response(
                    error_response(StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_MESSAGE)
                        .map_into_right_body(),
                ));
            }

            trace!("Admitted request from {}", client_id);
            let response = srv.call(req).await?.map_into_left_body();
            Ok(response)
        })
    }
}
