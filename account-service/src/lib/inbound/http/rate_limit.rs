use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use governor::clock::DefaultClock;
use governor::state::InMemoryState;
use governor::state::NotKeyed;
use governor::Quota;
use governor::RateLimiter;
use serde_json::json;

use crate::inbound::http::router::AppState;

/// Rate limiter guarding the login endpoint
pub type LoginRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

/// Create a rate limiter for login attempts.
///
/// # Arguments
/// * `per_minute` - Allowed attempts per minute (floored at 1)
///
/// # Returns
/// Shared limiter handle
pub fn create_login_rate_limiter(per_minute: u32) -> LoginRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute.max(1)).expect("quota is nonzero"));

    Arc::new(RateLimiter::direct(quota))
}

/// Middleware that throttles requests against the login rate limiter
pub async fn throttle_login(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    match state.login_limiter.check() {
        Ok(_) => next.run(request).await,
        Err(_) => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "Too many requests. Please try again later."
            })),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limiter_allows_within_quota() {
        let limiter = create_login_rate_limiter(3);

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }

    #[test]
    fn test_zero_quota_is_floored() {
        let limiter = create_login_rate_limiter(0);
        assert!(limiter.check().is_ok());
    }
}
