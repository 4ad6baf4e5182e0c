//! Authentication extractors for route handlers.
//!
//! Tokens are stateless: the extractor verifies the `Authorization: Bearer`
//! header against the shared signing secret and hands the decoded claims to
//! the handler. A missing or bad token is a 401 with a machine-readable
//! reason; a valid token with the wrong role is a 403.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use tamarind_core::Role;

use crate::error::AppError;
use crate::services::Claims;
use crate::state::AppState;

/// Extractor that requires a valid session token.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(claims): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", claims.name)
/// }
/// ```
pub struct RequireAuth(pub Claims);

impl FromRequestParts<AppState> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized("missing_token"))?;
        let claims = state.tokens().verify(token)?;
        Ok(Self(claims))
    }
}

/// Extractor that requires a valid token carrying the owner role.
///
/// Authentication failures are 401; an authenticated non-owner is 403.
pub struct RequireOwner(pub Claims);

impl FromRequestParts<AppState> for RequireOwner {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let RequireAuth(claims) = RequireAuth::from_request_parts(parts, state).await?;
        if claims.role != Role::Owner {
            return Err(AppError::Forbidden(
                "only the owner can access this resource".to_owned(),
            ));
        }
        Ok(Self(claims))
    }
}

/// Extractor that optionally decodes the current session.
///
/// Unlike `RequireAuth` this never rejects: an absent or invalid token
/// resolves to `None` and the handler serves the guest view. Checkout uses
/// this to price carts at the retail tier for anonymous buyers.
pub struct OptionalAuth(pub Option<Claims>);

impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_token(parts).and_then(|token| state.tokens().verify(token).ok());
        Ok(Self(claims))
    }
}

/// Pull the bearer token out of the `Authorization` header.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_header(value: &str) -> Parts {
        let (parts, ()) = Request::builder()
            .header(AUTHORIZATION, value)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn bearer_token_extracts_the_token() {
        let parts = parts_with_header("Bearer abc.def.ghi");
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));
    }

    #[test]
    fn non_bearer_schemes_are_ignored() {
        let parts = parts_with_header("Basic dXNlcjpwYXNz");
        assert_eq!(bearer_token(&parts), None);

        let parts = parts_with_header("Bearer ");
        assert_eq!(bearer_token(&parts), None);

        let (parts, ()) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(bearer_token(&parts), None);
    }
}
