//! Authentication middleware for the admin routes.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use romshelf_core::{AuthError, AuthRequest};

use crate::state::AppState;

/// Validate the shared admin key before letting a request through.
///
/// Failed authentication is always 401; only authenticator-internal
/// configuration problems map to 500.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    if authenticator.method_name() == "none" {
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let auth_request = AuthRequest { headers };

    match authenticator.authenticate(&auth_request).await {
        Ok(_identity) => Ok(next.run(request).await),
        Err(AuthError::NotAuthenticated) | Err(AuthError::InvalidCredentials(_)) => {
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}
