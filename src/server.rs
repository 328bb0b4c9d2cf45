//! Router assembly and the shared request state.

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::auth::TokenCodec;
use crate::config::AppConfig;
use crate::database::Store;
use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{admin_gate, rate_limit, RateLimiter};
use crate::services::AuthService;

/// Everything a handler needs, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub auth: AuthService,
    pub codec: TokenCodec,
    pub max_page_size: u32,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, config: &AppConfig) -> Self {
        let codec = TokenCodec::new(&config.security.jwt_secret, config.security.jwt_expiry_secs);
        let auth = AuthService::new(store.clone(), codec.clone(), config.security.bootstrap_admin.clone());
        Self {
            store,
            auth,
            codec,
            max_page_size: config.api.max_page_size,
        }
    }
}

/// Build the full application router.
pub fn app(state: AppState, config: &AppConfig) -> Router {
    let api = Router::new()
        .merge(public_routes())
        .nest("/admin", admin_routes(state.codec.clone()))
        .fallback(api_not_found);

    let mut router = Router::new().nest("/api", api).with_state(state);

    if config.api.enable_rate_limiting {
        let limiter = RateLimiter::new(
            config.api.rate_limit_requests,
            Duration::from_secs(config.api.rate_limit_window_secs),
        )
        .trust_forwarded_for(config.api.trust_forwarded_for);
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit));
    }

    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("SAMEORIGIN"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::REFERRER_POLICY,
                HeaderValue::from_static("no-referrer"),
            ))
            .layer(cors_layer(&config.security.cors_origins))
            .layer(DefaultBodyLimit::max(config.api.max_request_size_bytes)),
    )
}

/// Serve until the process is stopped. Peer addresses are exposed to the rate limiter.
pub async fn serve(listener: TcpListener, router: Router) -> std::io::Result<()> {
    axum::serve(listener, router.into_make_service_with_connect_info::<SocketAddr>()).await
}

fn public_routes() -> Router<AppState> {
    use handlers::public;

    Router::new()
        .route("/health", get(public::health::health))
        .route("/test-db", get(public::health::test_db))
        .route("/login", post(public::auth::login_post))
        .route("/register", post(public::auth::register_post))
        .route("/properties", get(public::properties::list))
        .route("/properties/:id", get(public::properties::show))
        .route("/search-rumah", post(public::properties::search))
}

fn admin_routes(codec: TokenCodec) -> Router<AppState> {
    use handlers::admin;

    Router::new()
        .route(
            "/properties",
            get(admin::properties::list).post(admin::properties::create),
        )
        .route(
            "/properties/:id",
            get(admin::properties::show)
                .put(admin::properties::update)
                .delete(admin::properties::delete),
        )
        .route("/stats", get(admin::stats::stats))
        .fallback(api_not_found)
        // Gate covers the fallback too, so unknown admin paths also need a token
        .layer(middleware::from_fn_with_state(codec, admin_gate))
}

async fn api_not_found() -> ApiError {
    ApiError::not_found("API endpoint not found")
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, HeaderName::from_static("x-requested-with")])
        .allow_credentials(true)
}
