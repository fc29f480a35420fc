use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::client_ip::client_ip;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn disable_two_factor(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<DisableTwoFactorRequestBody>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let origin = client_ip(&headers, peer);

    state
        .auth_service
        .disable_two_factor(&user.user_id, &body.password, &body.totp_code, &origin)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData::new("Two-factor authentication disabled"),
    ))
}

/// HTTP request body for disabling two-factor (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DisableTwoFactorRequestBody {
    password: String,
    totp_code: String,
}
