use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::account::models::TwoFactorSetup;
use crate::account::ports::AuthServicePort;
use crate::inbound::http::client_ip::client_ip;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn setup_two_factor(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<SetupTwoFactorRequestBody>,
) -> Result<ApiSuccess<SetupTwoFactorResponseData>, ApiError> {
    let origin = client_ip(&headers, peer);

    state
        .auth_service
        .setup_two_factor(&user.user_id, &body.password, &origin)
        .await
        .map_err(ApiError::from)
        .map(|ref setup| ApiSuccess::new(StatusCode::OK, setup.into()))
}

/// HTTP request body for starting two-factor setup (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SetupTwoFactorRequestBody {
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetupTwoFactorResponseData {
    pub secret: String,
    pub otpauth_uri: String,
    pub qr_code: String,
    pub backup_codes: Vec<String>,
}

impl From<&TwoFactorSetup> for SetupTwoFactorResponseData {
    fn from(setup: &TwoFactorSetup) -> Self {
        Self {
            secret: setup.secret.clone(),
            otpauth_uri: setup.otpauth_uri.clone(),
            qr_code: setup.qr_code.clone(),
            backup_codes: setup.backup_codes.clone(),
        }
    }
}
