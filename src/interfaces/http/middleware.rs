//! Bearer-token authentication middleware for Axum
//!
//! Verifies the `Authorization: Bearer <jwt>` header and stores the bound
//! identity in the request extensions as [`AuthenticatedUser`]. Whether the
//! user still exists is checked by the handler that loads it.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::application::AuthService;
use crate::domain::DomainError;
use crate::interfaces::http::common::{ApiError, ApiResponse};

/// Identity attached to an authenticated request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: i64,
    pub name: String,
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    Rejected(DomainError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            Self::MissingToken => {
                let body =
                    ApiResponse::<()>::error("MISSING_TOKEN", "Missing authentication token");
                (StatusCode::UNAUTHORIZED, Json(body)).into_response()
            }
            Self::Rejected(err) => ApiError(err).into_response(),
        }
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

pub async fn auth_middleware(
    State(auth): State<AuthService>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return AuthError::MissingToken.into_response();
    };

    let Some(token) = extract_token(auth_header) else {
        return AuthError::Rejected(DomainError::InvalidToken).into_response();
    };

    match auth.issuer().verify(token) {
        Ok(identity) => {
            request.extensions_mut().insert(AuthenticatedUser {
                user_id: identity.user_id,
                name: identity.name,
            });
            next.run(request).await
        }
        Err(err) => {
            debug!(code = err.code(), "Bearer token rejected");
            AuthError::Rejected(err).into_response()
        }
    }
}
