use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use tracing::debug;

use super::token::TokenVerifier;

/// Proof that the request carried a valid bearer token.
///
/// Add it as a handler argument to protect the route. With auth disabled in
/// config every request passes.
#[derive(Debug, Clone, Copy)]
pub struct ApiToken;

/// Rejection for a missing or invalid token: plain-text `Access Denied`.
#[derive(Debug)]
pub struct AuthRejection;

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Access Denied").into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiToken
where
    S: Send + Sync,
    Arc<TokenVerifier>: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let verifier = Arc::<TokenVerifier>::from_ref(state);
        if verifier.is_disabled() {
            return Ok(ApiToken);
        }

        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AuthRejection)?;

        let claims = verifier.verify(bearer.token()).map_err(|err| {
            debug!(error = %err, "Rejected bearer token");
            AuthRejection
        })?;

        debug!(
            subject = claims.sub.as_deref().unwrap_or("-"),
            "Accepted bearer token"
        );
        Ok(ApiToken)
    }
}
