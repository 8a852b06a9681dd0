//! Authentication gate
//!
//! Resolves the session cookie to an [`Identity`] before the request reaches
//! the room endpoint. Requests without a usable session are redirected to the
//! login path and never upgraded.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};

use crate::identity::Identity;

use super::listener::AppState;

/// Middleware attaching the caller's identity to the request extensions
pub async fn require_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    match state.authenticator.authenticate(req.headers()) {
        Ok(identity) => {
            req.extensions_mut().insert::<Identity>(identity);
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(
                path = %req.uri().path(),
                error = %e,
                "Redirecting unauthenticated request"
            );
            Redirect::temporary(&state.config.login_path).into_response()
        }
    }
}
