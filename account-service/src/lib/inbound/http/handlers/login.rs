use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::account::models::LoginCommand;
use crate::account::models::SessionTokens;
use crate::account::models::UserProfile;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::client_ip::client_ip;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<SessionResponseData>, ApiError> {
    let origin = client_ip(&headers, peer);

    let command = LoginCommand::new(
        body.username,
        body.password,
        body.remember_me,
        body.totp_code,
        origin,
    );

    state
        .auth_service
        .login(command)
        .await
        .map_err(ApiError::from)
        .map(|ref session| ApiSuccess::new(StatusCode::OK, session.into()))
}

/// HTTP request body for a login attempt (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    /// Username or email address
    username: String,
    password: String,
    #[serde(default)]
    remember_me: bool,
    totp_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResponseData {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: UserProfile,
}

impl From<&SessionTokens> for SessionResponseData {
    fn from(session: &SessionTokens) -> Self {
        Self {
            access_token: session.access_token.clone(),
            refresh_token: session.refresh_token.clone(),
            token_type: "bearer",
            expires_in: session.expires_in,
            user: session.profile.clone(),
        }
    }
}
