//! API middleware.

#![allow(missing_docs)]

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use axum_extra::extract::cookie::CookieJar;
use pollpad_core::{PollService, ResponseService, UserService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub poll_service: PollService,
    pub response_service: ResponseService,
}

/// Authentication middleware.
///
/// Resolves a bearer token from the `Authorization` header, falling back to
/// the `token` cookie, and stashes the authenticated user in the request
/// extensions. Requests without a valid token pass through anonymously;
/// extractors decide whether that is acceptable per endpoint.
pub async fn auth_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let mut token: Option<String> = None;

    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(bearer) = auth_str.strip_prefix("Bearer ")
    {
        token = Some(bearer.to_string());
    }

    if token.is_none()
        && let Some(cookie) = jar.get("token")
    {
        token = Some(cookie.value().to_string());
    }

    if let Some(token) = token
        && let Ok(user) = state.user_service.authenticate_by_token(&token).await
    {
        req.extensions_mut().insert(user);
    }

    next.run(req).await
}
