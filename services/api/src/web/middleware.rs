//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use soundwave_core::PortError;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::web::rest::{port_failure, ErrorBody};
use crate::web::state::AppState;

/// The verified caller, inserted into request extensions by the auth middleware.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AuthUser(pub Uuid);

/// Pulls the session token from `Authorization: Bearer` or the `session` cookie.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())?
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .filter(|t| !t.is_empty())
}

/// Resolves the caller. `Ok(None)` means no credentials were presented.
async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Option<AuthUser>, PortError> {
    let Some(token) = session_token(headers) else {
        return Ok(None);
    };
    state.db.validate_auth_session(token).await.map(|id| Some(AuthUser(id)))
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ErrorBody::new("Authentication required")),
    )
        .into_response()
}

/// Middleware that validates the session token and extracts the user_id.
///
/// If valid, inserts `AuthUser` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized. A session store that
/// cannot answer yields 500.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = authenticate(&state, req.headers()).await;
    match caller {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Ok(None) | Err(PortError::Unauthorized) => unauthorized(),
        Err(e) => port_failure("validate session", e).into_response(),
    }
}

/// Like `require_auth`, but lets anonymous callers through.
///
/// A token that fails validation is treated as no token at all. Storage
/// failures while checking the token still yield 500.
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    let caller = authenticate(&state, req.headers()).await;
    match caller {
        Ok(Some(user)) => {
            req.extensions_mut().insert(user);
        }
        Ok(None) => {}
        Err(PortError::Unauthorized) => debug!("Unknown or expired session; continuing anonymously"),
        Err(e) => return port_failure("validate session", e).into_response(),
    }
    next.run(req).await
}
