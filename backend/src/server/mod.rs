//! HTTP server assembly: app construction and the accept loop.

pub mod config;
pub mod state_builders;

pub use config::{RuntimeOptions, ServerConfig};
pub use state_builders::{StateBuildError, build_state};

use actix_session::SessionMiddleware;
use actix_session::storage::CookieSessionStore;
use actix_web::cookie::Key;
use actix_web::{App, HttpServer, web};
#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetricsBuilder;
#[cfg(debug_assertions)]
use utoipa::OpenApi;
#[cfg(debug_assertions)]
use utoipa_swagger_ui::SwaggerUi;

#[cfg(debug_assertions)]
use crate::doc::ApiDoc;
use crate::inbound::http::health::{HealthState, live, ready};
use crate::inbound::http::state::HttpState;
use crate::inbound::http::storage::MAX_ASSET_BYTES;
use crate::middleware::RequestTrace;

/// Build one worker's application: state, session middleware, trace
/// middleware, API routes, and health probes.
pub fn build_app(
    state: HttpState,
    health: web::Data<HealthState>,
    key: Key,
    cookie_secure: bool,
    same_site: actix_web::cookie::SameSite,
) -> App<
    impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
> {
    let session = SessionMiddleware::builder(CookieSessionStore::default(), key)
        .cookie_name("session".into())
        .cookie_path("/".into())
        .cookie_secure(cookie_secure)
        .cookie_http_only(true)
        .cookie_same_site(same_site)
        .build();

    let api = crate::inbound::http::api_scope().wrap(session);

    let mut app = App::new()
        .app_data(web::Data::new(state))
        .app_data(health)
        .app_data(web::PayloadConfig::new(MAX_ASSET_BYTES))
        .wrap(RequestTrace)
        .service(api)
        .service(live)
        .service(ready);

    #[cfg(debug_assertions)]
    {
        app = app.service(SwaggerUi::new("/docs/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    app
}

/// Bind and run the server until shutdown.
///
/// # Errors
///
/// Returns the bind or accept-loop error.
pub async fn run(server_config: ServerConfig, state: HttpState) -> std::io::Result<()> {
    let ServerConfig {
        key,
        cookie_secure,
        same_site,
        bind_addr,
    } = server_config;

    let health = web::Data::new(HealthState::new());
    let server_health = health.clone();

    let server = HttpServer::new(move || {
        let app = build_app(
            state.clone(),
            server_health.clone(),
            key.clone(),
            cookie_secure,
            same_site,
        );
        #[cfg(feature = "metrics")]
        let app = {
            let prometheus = make_metrics();
            app.wrap(prometheus)
        };
        app
    })
    .bind(bind_addr)?;

    health.mark_ready();
    server.run().await
}

#[cfg(feature = "metrics")]
fn make_metrics() -> actix_web_prom::PrometheusMetrics {
    PrometheusMetricsBuilder::new("trendforge")
        .endpoint("/metrics")
        .build()
        .unwrap_or_else(|error| panic!("failed to configure Prometheus metrics: {error}"))
}
