//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use pollpad_common::AppResult;
use pollpad_db::entities::user::{self, Role};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// Safe user view, stripped of credentials.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

impl From<&user::Model> for UserResponse {
    fn from(user: &user::Model) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

fn auth_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(("token", token.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}

/// Signup request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 2, max = 128))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(min = 6, max = 128))]
    pub password: String,
}

/// Auth response: the safe user plus their bearer token.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: UserResponse,
    pub token: String,
}

/// Create a new creator account.
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SignupRequest>,
) -> AppResult<(CookieJar, ApiResponse<AuthResponse>)> {
    req.validate()?;

    let input = pollpad_core::SignupInput {
        username: req.username,
        email: req.email,
        password: req.password,
    };

    let user = state.user_service.create(input).await?;
    let token = user.token.clone().unwrap_or_default();

    Ok((
        jar.add(auth_cookie(&token)),
        ApiResponse::created(AuthResponse {
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

/// Signin request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Sign in to an existing account.
async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<SigninRequest>,
) -> AppResult<(CookieJar, ApiResponse<AuthResponse>)> {
    let user = state
        .user_service
        .authenticate(&req.email, &req.password)
        .await?;
    let token = user.token.clone().unwrap_or_default();

    Ok((
        jar.add(auth_cookie(&token)),
        ApiResponse::ok(AuthResponse {
            user: UserResponse::from(&user),
            token,
        }),
    ))
}

/// Current-user response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserResponse,
}

/// Identity echo for the authenticated user.
async fn me(AuthUser(user): AuthUser) -> AppResult<ApiResponse<MeResponse>> {
    Ok(ApiResponse::ok(MeResponse {
        user: UserResponse::from(&user),
    }))
}

/// Signout response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignoutResponse {
    pub ok: bool,
}

/// Sign out (invalidate the current token by regenerating it).
async fn signout(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, ApiResponse<SignoutResponse>)> {
    state.user_service.regenerate_token(&user.id).await?;

    Ok((
        jar.remove(Cookie::from("token")),
        ApiResponse::ok(SignoutResponse { ok: true }),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/signin", post(signin))
        .route("/signout", post(signout))
        .route("/me", get(me))
}
