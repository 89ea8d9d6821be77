//! API endpoints.

mod auth;
mod polls;
mod responses;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/polls", polls::router().merge(responses::router()))
}
