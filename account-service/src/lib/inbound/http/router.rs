use std::sync::Arc;
use std::time::Duration;

use auth::TokenIssuer;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::change_password::change_password;
use super::handlers::disable_two_factor::disable_two_factor;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::refresh::refresh;
use super::handlers::setup_two_factor::setup_two_factor;
use super::handlers::verify_two_factor::verify_two_factor;
use super::middleware::authenticate as auth_middleware;
use super::rate_limit::create_login_rate_limiter;
use super::rate_limit::throttle_login;
use super::rate_limit::LoginRateLimiter;
use crate::domain::account::service::AuthService;
use crate::outbound::repositories::audit::PostgresAuditStore;
use crate::outbound::repositories::user::PostgresUserRepository;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService<PostgresUserRepository, PostgresAuditStore>>,
    pub token_issuer: Arc<TokenIssuer>,
    pub login_limiter: LoginRateLimiter,
}

pub fn create_router(
    auth_service: Arc<AuthService<PostgresUserRepository, PostgresAuditStore>>,
    token_issuer: Arc<TokenIssuer>,
    login_rate_limit_per_minute: u32,
) -> Router {
    let state = AppState {
        auth_service,
        token_issuer,
        login_limiter: create_login_rate_limiter(login_rate_limit_per_minute),
    };

    let login_routes = Router::new()
        .route("/api/auth/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            throttle_login,
        ));

    let public_routes = Router::new().route("/api/auth/refresh", post(refresh));

    let protected_routes = Router::new()
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/change-password", post(change_password))
        .route("/api/auth/2fa/setup", post(setup_two_factor))
        .route("/api/auth/2fa/verify", post(verify_two_factor))
        .route("/api/auth/2fa/disable", post(disable_two_factor))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(login_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
