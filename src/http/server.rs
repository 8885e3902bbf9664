//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the rate and health handlers
//! - Wire up middleware (request ID, tracing, timeout, CORS, metrics)
//! - Serve on a bound listener until shutdown is signalled

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderValue, Method, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::{HttpConfig, ServiceConfig};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, RequestId, X_REQUEST_ID};
use crate::http::response::ApiError;
use crate::http::{health, rates};
use crate::observability::metrics;
use crate::rates::RateService;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<RateService>,
    pub config: Arc<ServiceConfig>,
    pub started_at: Instant,
}

/// HTTP front end for the rate service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: ServiceConfig, service: Arc<RateService>) -> Self {
        let config = Arc::new(config);
        let state = AppState {
            service,
            config: config.clone(),
            started_at: Instant::now(),
        };

        let router = Self::build_router(&config.http, state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(http: &HttpConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/health", get(health::detailed_health))
            .route("/rates/current", get(rates::current_rate))
            .route("/rates/historical", get(rates::historical_rates))
            .route("/rates/average", get(rates::average_rate));

        let prefix = http.api_prefix.trim_end_matches('/');
        let routes = Router::new()
            .route("/", get(health::root))
            .route("/health", get(health::liveness));
        let routes = if prefix.is_empty() {
            routes.merge(api)
        } else {
            routes.nest(prefix, api)
        };

        routes
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(track_metrics))
            .layer(TimeoutLayer::new(Duration::from_secs(http.request_timeout_secs)))
            .layer(cors_layer(&http.cors_origins))
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` fires, then drain in-flight requests.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&route, response.status().as_u16(), start);
    response
}

async fn not_found(request_id: RequestId) -> impl IntoResponse {
    ApiError::not_found("Resource not found", request_id.0)
}
