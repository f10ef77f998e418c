use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::CookieJar;
use service_core::error::AppError;

use crate::{
    dtos::ErrorResponse,
    models::{Actor, Role},
    AppState,
};

/// Cookie set by the web frontend after login.
pub const AUTH_COOKIE: &str = "auth-token";

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Bearer header first, then the auth cookie.
fn token_from(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .or_else(|| jar.get(AUTH_COOKIE).map(|cookie| cookie.value().to_string()))
}

/// Middleware to require authentication
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorResponse>)> {
    let token = token_from(req.headers(), &jar)
        .ok_or_else(|| unauthorized("Access denied. No token provided."))?;

    let claims = state.jwt.validate_access_token(&token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        unauthorized("Invalid token.")
    })?;

    let actor = Actor::from(claims);
    tracing::Span::current().record("user_id", tracing::field::display(actor.user_id));
    req.extensions_mut().insert(actor);

    Ok(next.run(req).await)
}

async fn require_roles(roles: &[Role], req: Request, next: Next) -> Result<Response, AppError> {
    let actor = req.extensions().get::<Actor>().ok_or_else(|| {
        AppError::InternalError(anyhow::anyhow!("Actor missing from request extensions"))
    })?;

    if !roles.contains(&actor.role) {
        tracing::warn!(
            user_id = %actor.user_id,
            role = actor.role.as_str(),
            path = %req.uri().path(),
            "Insufficient permissions"
        );
        return Err(AppError::Forbidden(anyhow::anyhow!("Insufficient permissions.")));
    }

    Ok(next.run(req).await)
}

/// Any back-office role.
pub async fn require_staff(req: Request, next: Next) -> Result<Response, AppError> {
    require_roles(Role::STAFF, req, next).await
}

/// Roles that may open registrations and enroll students.
pub async fn require_registrar(req: Request, next: Next) -> Result<Response, AppError> {
    require_roles(Role::REGISTRARS, req, next).await
}

/// Extractor to easily get the acting user in handlers
pub struct AuthUser(pub Actor);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let actor = parts
            .extensions
            .get::<Actor>()
            .ok_or_else(|| unauthorized("Authentication required."))?;

        Ok(AuthUser(actor.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_extra::extract::cookie::Cookie;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer header-token".parse().unwrap());
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, "cookie-token"));

        assert_eq!(token_from(&headers, &jar).as_deref(), Some("header-token"));
    }

    #[test]
    fn cookie_is_used_without_header() {
        let jar = CookieJar::new().add(Cookie::new(AUTH_COOKIE, "cookie-token"));
        assert_eq!(
            token_from(&HeaderMap::new(), &jar).as_deref(),
            Some("cookie-token")
        );
    }

    #[test]
    fn non_bearer_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(token_from(&headers, &CookieJar::new()), None);
    }
}
