//! Access-gateway middleware.
//!
//! Every request passes through here once: the path is classified, the
//! session cookie (if any) is verified, and the request is allowed,
//! redirected, or rejected. The decision is a pure function of the
//! classification and token validity; an invalid token is data, not a
//! fault.

use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::AuthError;
use super::cookie;
use super::routes::{RouteClass, classify};
use super::token::Claims;
use crate::server::AppState;

/// Where authenticated users land, and where they are bounced back to when
/// they revisit the public-only pages.
pub const AUTHENTICATED_HOME: &str = "/yakap";

/// Terminal verdict for a single request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Forward to the handler.
    Allow,
    /// Authenticated user on a public-only page; send them home.
    RedirectHome,
    /// Unauthenticated user on a protected app page; send them to login.
    RedirectLogin,
    /// Unauthenticated API call; reject with 401 JSON, never a redirect.
    RejectUnauthorized,
}

/// Decide the verdict for a classified route.
///
/// Total and deterministic over (classification, token validity); there is
/// no retry and no partial trust.
#[must_use]
pub fn decide(class: RouteClass, authenticated: bool) -> Verdict {
    match class {
        RouteClass::Excluded | RouteClass::ApiPublic => Verdict::Allow,
        RouteClass::Public => {
            if authenticated {
                Verdict::RedirectHome
            } else {
                Verdict::Allow
            }
        }
        RouteClass::ApiProtected => {
            if authenticated {
                Verdict::Allow
            } else {
                Verdict::RejectUnauthorized
            }
        }
        RouteClass::AppProtected => {
            if authenticated {
                Verdict::Allow
            } else {
                Verdict::RedirectLogin
            }
        }
    }
}

/// The access-gateway middleware.
///
/// Verified claims are attached to the request's extensions so handlers
/// receive the session explicitly through extractors rather than reading
/// ambient state.
pub async fn access_gateway(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let class = classify(&path);

    // Fail closed: any unreadable or unverifiable token counts as absent.
    let claims = cookie::read(&jar).and_then(|token| state.codec.verify(&token).ok());

    match decide(class, claims.is_some()) {
        Verdict::Allow => {
            if let Some(claims) = claims {
                req.extensions_mut().insert(claims);
            }
            next.run(req).await
        }
        Verdict::RedirectHome => Redirect::to(AUTHENTICATED_HOME).into_response(),
        Verdict::RedirectLogin => {
            tracing::debug!(%path, "redirecting unauthenticated request to login");
            let to = format!("/login?from={}", urlencoding::encode(&path));
            Redirect::to(&to).into_response()
        }
        Verdict::RejectUnauthorized => {
            tracing::debug!(%path, "rejecting unauthenticated API request");
            AuthError::Unauthorized.into_response()
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::InvalidCredentials => (StatusCode::UNAUTHORIZED, "invalid_credentials"),
            Self::Unauthorized | Self::InvalidToken => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            Self::UserNotFound(_) => (StatusCode::NOT_FOUND, "user_not_found"),
            Self::UsernameTaken(_) => (StatusCode::CONFLICT, "username_taken"),
            Self::Storage(detail) | Self::Config(detail) => {
                // Full detail stays server-side
                tracing::error!(%detail, "internal auth failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
        };

        (status, Json(json!({ "ok": false, "error": code }))).into_response()
    }
}

/// Extractor for the authenticated session.
///
/// The access gateway has already verified the token for protected routes;
/// this hands the claims to the handler. Requests that somehow reach a
/// handler without claims are rejected, keeping the default closed.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AuthError::Unauthorized.into_response())
    }
}

/// Extractor requiring an ADMIN session.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Claims);

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;

        if !claims.role.is_admin() {
            return Err(
                AuthError::Forbidden("Admin role required".to_string()).into_response()
            );
        }

        Ok(Self(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decide_excluded_and_api_public() {
        assert_eq!(decide(RouteClass::Excluded, false), Verdict::Allow);
        assert_eq!(decide(RouteClass::Excluded, true), Verdict::Allow);
        assert_eq!(decide(RouteClass::ApiPublic, false), Verdict::Allow);
        assert_eq!(decide(RouteClass::ApiPublic, true), Verdict::Allow);
    }

    #[test]
    fn test_decide_public_pages() {
        assert_eq!(decide(RouteClass::Public, false), Verdict::Allow);
        // Authenticated users are bounced away from login-only pages
        assert_eq!(decide(RouteClass::Public, true), Verdict::RedirectHome);
    }

    #[test]
    fn test_decide_protected_api() {
        assert_eq!(
            decide(RouteClass::ApiProtected, false),
            Verdict::RejectUnauthorized
        );
        assert_eq!(decide(RouteClass::ApiProtected, true), Verdict::Allow);
    }

    #[test]
    fn test_decide_protected_app() {
        assert_eq!(
            decide(RouteClass::AppProtected, false),
            Verdict::RedirectLogin
        );
        assert_eq!(decide(RouteClass::AppProtected, true), Verdict::Allow);
    }

    #[test]
    fn test_error_statuses() {
        assert_eq!(
            AuthError::InvalidCredentials.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::InvalidToken.into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::Forbidden("nope".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AuthError::UserNotFound("u".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AuthError::UsernameTaken("u".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AuthError::Storage("boom".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
