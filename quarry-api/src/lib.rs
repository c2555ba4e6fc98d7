use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod error;
pub mod offers;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS: the search surface is consumed cross-origin by tooling
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            header::AUTHORIZATION,
            header::ACCEPT,
        ])
        .max_age(Duration::from_secs(86400));

    let protected = Router::new()
        .route("/offers/search", get(offers::search_offers))
        .route("/offers/redirect", get(offers::redirect_offer))
        .route("/admin/registry", get(admin::list_registry))
        .route("/admin/cache/refresh", post(admin::refresh_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    Router::new()
        .route("/offers/health", get(health))
        .merge(protected)
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

/// Public health probe; text by default, JSON when asked for
async fn health(headers: HeaderMap) -> Response {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if accept.contains("application/json") {
        Json(json!({ "status": "ok" })).into_response()
    } else {
        "ok".into_response()
    }
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not_found" }))).into_response()
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    // Fail open: no cache, no peer address, or a Redis error all let the
    // request through
    let Some(cache) = state.cache.clone() else {
        return Ok(next.run(req).await);
    };
    let Some(addr) = req.extensions().get::<ConnectInfo<SocketAddr>>() else {
        return Ok(next.run(req).await);
    };

    let key = format!("ratelimit:{}", addr.0.ip());
    match cache.check_rate_limit(&key, 100, 60).await {
        Ok(true) | Err(_) => Ok(next.run(req).await),
        Ok(false) => Err((
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "rate_limited" })),
        )
            .into_response()),
    }
}
