//! Domain error to HTTP response mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tracing::error;

use super::ApiResponse;
use crate::domain::DomainError;

/// Handler error. Client errors keep their message; server faults are logged
/// in full and answered with a generic 500.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DomainError::EmailExists(_) => StatusCode::CONFLICT,
            DomainError::EmailNotFound(_) => StatusCode::NOT_FOUND,
            DomainError::WrongPassword
            | DomainError::InvalidUser(_)
            | DomainError::InvalidToken
            | DomainError::ExpiredToken => StatusCode::UNAUTHORIZED,
            DomainError::MalformedEmail(_)
            | DomainError::Hashing(_)
            | DomainError::Signing(_)
            | DomainError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if self.0.is_client_error() {
            self.0.to_string()
        } else {
            error!(error = %self.0, code = self.0.code(), "Request failed with server fault");
            "Internal server error".to_string()
        };

        let body = ApiResponse::<()>::error(self.0.code(), message);
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn server_fault_detail_stays_out_of_the_body() {
        let response =
            ApiError(DomainError::Persistence("disk /var/lib full".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "Internal server error");
        assert!(!json.to_string().contains("/var/lib"));
    }

    #[tokio::test]
    async fn client_error_carries_code_and_message() {
        let response = ApiError(DomainError::EmailExists("a@b.com".into())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "EMAIL_EXISTS");
        assert!(json["data"].is_null());
    }

    #[test]
    fn authentication_failures_are_401() {
        for err in [
            DomainError::WrongPassword,
            DomainError::InvalidUser(3),
            DomainError::InvalidToken,
            DomainError::ExpiredToken,
        ] {
            assert_eq!(ApiError(err).status(), StatusCode::UNAUTHORIZED);
        }
        assert_eq!(
            ApiError(DomainError::EmailNotFound("x@y.z".into())).status(),
            StatusCode::NOT_FOUND
        );
    }
}
