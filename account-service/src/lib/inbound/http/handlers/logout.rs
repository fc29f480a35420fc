use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::MessageData;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::client_ip::client_ip;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<MessageData>, ApiError> {
    let origin = client_ip(&headers, peer);

    state
        .auth_service
        .logout(&user.user_id, &origin)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        MessageData::new("Successfully logged out"),
    ))
}
