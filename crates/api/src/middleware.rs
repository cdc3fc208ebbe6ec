//! Bearer-token authentication for the protected surface.
//!
//! Validates the JWT, then injects a [`PrincipalContext`] into request
//! extensions for handlers and the command authorization guard. Failures
//! answer 401 with the standard error body; role checks happen later, per
//! route.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use tradepost_auth::JwtValidator;

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, Response> {
    let token = extract_bearer(req.headers())?;

    let claims = state.jwt.validate(token, Utc::now()).map_err(|e| {
        errors::json_error(StatusCode::UNAUTHORIZED, "unauthenticated", e.to_string())
    })?;

    req.extensions_mut()
        .insert(PrincipalContext::new(claims.sub, claims.role));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, Response> {
    let unauthenticated = || {
        errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "missing or malformed Authorization header",
        )
    };

    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(unauthenticated)?
        .to_str()
        .map_err(|_| unauthenticated())?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(unauthenticated)?
        .trim();
    if token.is_empty() {
        return Err(unauthenticated());
    }

    Ok(token)
}
