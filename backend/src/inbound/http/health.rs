//! Liveness and readiness probes.
//!
//! ```text
//! GET /healthz/live   Always 200 once the process is up
//! GET /healthz/ready  200 after startup wiring finished, 503 before
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use actix_web::{HttpResponse, get, web};

/// Shared readiness flag, flipped once startup wiring completes.
#[derive(Clone, Default)]
pub struct HealthState {
    ready: Arc<AtomicBool>,
}

impl HealthState {
    /// Create an un-ready state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the service ready to receive traffic.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether startup wiring has completed.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/healthz/live",
    responses((status = 200, description = "Process is up")),
    tags = ["health"],
    operation_id = "live",
    security([])
)]
#[get("/healthz/live")]
pub async fn live() -> HttpResponse {
    HttpResponse::Ok().finish()
}

/// Readiness probe.
#[utoipa::path(
    get,
    path = "/healthz/ready",
    responses(
        (status = 200, description = "Ready for traffic"),
        (status = 503, description = "Still starting")
    ),
    tags = ["health"],
    operation_id = "ready",
    security([])
)]
#[get("/healthz/ready")]
pub async fn ready(health: web::Data<HealthState>) -> HttpResponse {
    if health.is_ready() {
        HttpResponse::Ok().finish()
    } else {
        HttpResponse::ServiceUnavailable().finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{App, test};

    #[actix_web::test]
    async fn ready_flips_after_mark_ready() {
        let health = HealthState::new();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(health.clone()))
                .service(live)
                .service(ready),
        )
        .await;

        let before =
            test::call_service(&app, test::TestRequest::get().uri("/healthz/ready").to_request())
                .await;
        assert_eq!(before.status(), StatusCode::SERVICE_UNAVAILABLE);

        health.mark_ready();
        let after =
            test::call_service(&app, test::TestRequest::get().uri("/healthz/ready").to_request())
                .await;
        assert_eq!(after.status(), StatusCode::OK);

        let live_res =
            test::call_service(&app, test::TestRequest::get().uri("/healthz/live").to_request())
                .await;
        assert_eq!(live_res.status(), StatusCode::OK);
    }
}
