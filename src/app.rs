use axum::{
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::connection::{require_initialized, ConnectionStatus};
use crate::db_storage::LeadStore;
use crate::handlers::{self, AppState};
use crate::lead_service::LeadService;
use crate::links::LinkConfig;
use crate::repository::LeadRepository;

/// Per-IP request budget for the lead routes.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    pub per_second: u64,
    pub burst: u32,
}

#[derive(Debug, Clone)]
pub struct RouterOptions {
    pub body_limit_bytes: usize,
    /// Requires the server to be run with connect info. `None` disables limiting.
    pub rate_limit: Option<RateLimit>,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            body_limit_bytes: 1024 * 1024,
            rate_limit: None,
        }
    }
}

/// Hardening headers added to every response unless a handler set them.
/// No Content-Security-Policy, so the docs page can load its CDN assets.
const SECURITY_HEADERS: [(&str, &str); 11] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

fn with_security_headers(mut app: Router) -> Router {
    for (name, value) in SECURITY_HEADERS {
        app = app.layer(SetResponseHeaderLayer::if_not_present(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        ));
    }
    app
}

/// Wires storage, health status and links into the shared handler state.
pub fn build_state(
    store: Arc<dyn LeadStore>,
    status: ConnectionStatus,
    links: LinkConfig,
) -> Arc<AppState> {
    let repository = LeadRepository::new(store, status.clone());
    Arc::new(AppState {
        leads: LeadService::new(repository, links),
        status,
    })
}

/// Builds the HTTP application.
///
/// `/api/lead` sits behind the initialization gate and, when configured, the
/// rate limiter. `/health` and the docs bypass both.
pub fn build_router(state: Arc<AppState>, options: RouterOptions) -> anyhow::Result<Router> {
    let mut lead_routes = Router::new()
        .route(
            "/api/lead",
            post(handlers::create_lead).put(handlers::update_lead),
        )
        .layer(RequestBodyLimitLayer::new(options.body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            state.status.clone(),
            require_initialized,
        ));

    if let Some(limit) = options.rate_limit {
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(limit.per_second)
                .burst_size(limit.burst)
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .ok_or_else(|| anyhow::anyhow!("Invalid rate limit configuration"))?,
        );
        lead_routes = lead_routes.layer(ServiceBuilder::new().layer(GovernorLayer {
            config: governor_conf,
        }));
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::POST, Method::PUT])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::ORIGIN])
        .allow_credentials(false);

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route("/docs", get(handlers::serve_swagger_ui))
        .route("/api-docs/openapi.yml", get(handlers::serve_openapi_spec))
        .merge(lead_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(with_security_headers(app))
}
