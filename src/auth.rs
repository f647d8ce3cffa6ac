//! # Authentication and Authorization
//!
//! Bearer-token authentication for protected routes and the single role
//! predicate every handler uses for authorization.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::config::AppConfig;
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::Role;
use crate::server::AppState;
use crate::tokens::{TokenError, TokenService, TokenType};

/// Roles allowed to manage employees and departments.
pub const DIRECTORY_MANAGERS: &[Role] = &[Role::Admin, Role::Hr];
/// Roles allowed to approve or reject leave.
pub const LEAVE_APPROVERS: &[Role] = &[Role::Admin, Role::Hr, Role::Manager];
pub const ADMINS: &[Role] = &[Role::Admin];

/// Identity of the caller, resolved from a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i32,
    pub role: Role,
}

impl AuthUser {
    /// Fails with 403 unless the caller holds one of `allowed`.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), ApiError> {
        if self.role.is_any_of(allowed) {
            Ok(())
        } else {
            tracing::info!(
                user_id = self.user_id,
                role = %self.role,
                "Rejected request for insufficient role"
            );
            Err(forbidden(None))
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.tokens.clone()
    }
}

/// Authentication middleware that validates bearer access tokens
pub async fn auth_middleware(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers())?;
    let claims = tokens
        .verify(token, TokenType::Access)
        .map_err(token_rejection)?;
    let user_id = claims.user_id().map_err(token_rejection)?;

    tracing::debug!(user_id, role = %claims.role, "Authenticated request");

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
    });

    Ok(next.run(request).await)
}

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized(Some("Missing Authorization header")))?
        .to_str()
        .map_err(|_| unauthorized(Some("Invalid Authorization header")))?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| unauthorized(Some("Authorization header must use Bearer scheme")))
}

pub(crate) fn token_rejection(error: TokenError) -> ApiError {
    match error {
        TokenError::Expired => unauthorized(Some("Token has expired")),
        TokenError::Signing(err) => {
            tracing::error!(error = %err, "Token signing failed");
            ApiError::from(anyhow::anyhow!(err))
        }
        TokenError::Invalid | TokenError::WrongType { .. } => {
            unauthorized(Some("Invalid or expired token"))
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| unauthorized(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode},
        routing::get,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    fn tokens() -> TokenService {
        TokenService::new(
            b"test-secret-test-secret-test-secret!",
            Duration::hours(1),
            Duration::days(7),
        )
    }

    async fn run_middleware(request: Request<Body>) -> Response {
        async fn handler(user: AuthUser) -> Result<String, ApiError> {
            user.require_role(LEAVE_APPROVERS)?;
            Ok(format!("{}:{}", user.user_id, user.role))
        }

        Router::new()
            .route("/test", get(handler))
            .layer(axum::middleware::from_fn_with_state(tokens(), auth_middleware))
            .oneshot(request)
            .await
            .unwrap()
    }

    fn bearer(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn missing_auth_header_returns_401() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = run_middleware(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn invalid_auth_scheme_returns_401() {
        let request = Request::builder()
            .uri("/test")
            .header("Authorization", "Basic dGVzdDoxMjM=")
            .body(Body::empty())
            .unwrap();
        let response = run_middleware(request).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_returns_401() {
        let response = run_middleware(bearer("wrong-token")).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_cannot_authenticate() {
        let token = tokens()
            .issue(1, Role::Admin, TokenType::Refresh, Utc::now())
            .unwrap();
        let response = run_middleware(bearer(&token)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn insufficient_role_returns_403() {
        let token = tokens()
            .issue(3, Role::Employee, TokenType::Access, Utc::now())
            .unwrap();
        let response = run_middleware(bearer(&token)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn valid_token_passes_identity_through() {
        let token = tokens()
            .issue(5, Role::Manager, TokenType::Access, Utc::now())
            .unwrap();
        let response = run_middleware(bearer(&token)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"5:manager");
    }

    #[test]
    fn role_sets_cover_expected_roles() {
        assert!(Role::Hr.is_any_of(DIRECTORY_MANAGERS));
        assert!(!Role::Manager.is_any_of(DIRECTORY_MANAGERS));
        assert!(Role::Manager.is_any_of(LEAVE_APPROVERS));
        assert!(!Role::Hr.is_any_of(ADMINS));
    }
}
