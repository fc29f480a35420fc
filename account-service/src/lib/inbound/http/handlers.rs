use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::account::errors::AuthError;

pub mod change_password;
pub mod disable_two_factor;
pub mod login;
pub mod logout;
pub mod refresh;
pub mod setup_two_factor;
pub mod verify_two_factor;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::UnprocessableEntity(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
        };

        (status, Json(ApiResponseBody::new_error(status, message))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            // Authentication and state rejections share the status; the
            // message carries the specific blocking condition where it is
            // safe to reveal
            AuthError::InvalidCredentials
            | AuthError::InvalidToken
            | AuthError::InvalidTotpCode
            | AuthError::AccountInactive
            | AuthError::AccountLocked { .. } => ApiError::Unauthorized(err.to_string()),
            AuthError::TotpCodeRequired
            | AuthError::PasswordMismatch
            | AuthError::WeakPassword(_)
            | AuthError::TwoFactorNotInitiated
            | AuthError::TwoFactorNotEnabled => ApiError::BadRequest(err.to_string()),
            AuthError::NotFound(_) => ApiError::NotFound(err.to_string()),
            AuthError::InvalidUserId(_)
            | AuthError::InvalidUsername(_)
            | AuthError::InvalidEmail(_) => ApiError::UnprocessableEntity(err.to_string()),
            AuthError::Password(_)
            | AuthError::Token(_)
            | AuthError::Totp(_)
            | AuthError::DatabaseError(_)
            | AuthError::Unknown(_) => ApiError::InternalServerError(err.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData { message },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub message: String,
}

/// Acknowledgement body for operations without a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageData {
    pub message: String,
}

impl MessageData {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[test]
    fn test_locked_account_maps_to_unauthorized_with_expiry() {
        let until = Utc::now();
        let api_err = ApiError::from(AuthError::AccountLocked { until });

        match api_err {
            ApiError::Unauthorized(msg) => assert!(msg.contains("locked until")),
            other => panic!("Expected Unauthorized, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_totp_code_is_a_bad_request() {
        let api_err = ApiError::from(AuthError::TotpCodeRequired);
        assert!(matches!(api_err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_infrastructure_errors_do_not_leak_categories() {
        let api_err = ApiError::from(AuthError::DatabaseError("connection refused".to_string()));
        assert!(matches!(api_err, ApiError::InternalServerError(_)));
    }
}
