//! Poll management endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch, post},
};
use pollpad_common::AppResult;
use pollpad_core::{CreatePollInput, UpdatePollInput};
use pollpad_db::entities::poll::{self, PollKind};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{extractors::CreatorUser, middleware::AppState, response::ApiResponse};

/// Creator-facing poll view, counters included.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub id: String,
    pub title: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: PollKind,
    pub options: Vec<String>,
    pub code: String,
    pub is_live: bool,
    pub total_responses: i32,
    pub option_counts: Vec<i64>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&poll::Model> for PollResponse {
    fn from(poll: &poll::Model) -> Self {
        Self {
            id: poll.id.clone(),
            title: poll.title.clone(),
            question: poll.question.clone(),
            description: poll.description.clone(),
            kind: poll.kind.clone(),
            options: poll.option_labels(),
            code: poll.code.clone(),
            is_live: poll.is_live,
            total_responses: poll.total_responses,
            option_counts: poll.counts(),
            created_at: poll.created_at.to_rfc3339(),
            updated_at: poll.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Audience-facing poll view, no counters and no owner reference.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPollResponse {
    pub id: String,
    pub title: String,
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: PollKind,
    pub options: Vec<String>,
    pub code: String,
    pub is_live: bool,
    pub created_at: String,
}

impl From<&poll::Model> for PublicPollResponse {
    fn from(poll: &poll::Model) -> Self {
        Self {
            id: poll.id.clone(),
            title: poll.title.clone(),
            question: poll.question.clone(),
            description: poll.description.clone(),
            kind: poll.kind.clone(),
            options: poll.option_labels(),
            code: poll.code.clone(),
            is_live: poll.is_live,
            created_at: poll.created_at.to_rfc3339(),
        }
    }
}

/// Create-poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(min = 1, max = 512))]
    pub question: String,

    pub description: Option<String>,

    pub kind: PollKind,

    #[serde(default)]
    pub options: Vec<String>,
}

/// Create a poll.
async fn create_poll(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Json(req): Json<CreatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let poll = state
        .poll_service
        .create(
            &user.id,
            CreatePollInput {
                title: req.title,
                question: req.question,
                description: req.description,
                kind: req.kind,
                options: req.options,
            },
        )
        .await?;

    Ok(ApiResponse::created(PollResponse::from(&poll)))
}

/// Poll list response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollListResponse {
    pub polls: Vec<PollResponse>,
}

/// List the authenticated creator's polls.
async fn list_my_polls(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PollListResponse>> {
    let polls = state.poll_service.list_mine(&user.id).await?;

    Ok(ApiResponse::ok(PollListResponse {
        polls: polls.iter().map(PollResponse::from).collect(),
    }))
}

/// Dashboard overview response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub total_polls: u64,
    pub live_polls: u64,
    pub closed_polls: u64,
    pub total_responses: i64,
    pub recent_polls: Vec<RecentPollResponse>,
}

/// Recent-poll line on the overview.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPollResponse {
    pub id: String,
    pub title: String,
    pub is_live: bool,
    pub code: String,
    pub created_at: String,
}

/// Creator dashboard overview.
async fn overview(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<OverviewResponse>> {
    let overview = state.poll_service.overview(&user.id).await?;

    Ok(ApiResponse::ok(OverviewResponse {
        total_polls: overview.total_polls,
        live_polls: overview.live_polls,
        closed_polls: overview.closed_polls,
        total_responses: overview.total_responses,
        recent_polls: overview
            .recent
            .iter()
            .map(|p| RecentPollResponse {
                id: p.id.clone(),
                title: p.title.clone(),
                is_live: p.is_live,
                code: p.code.clone(),
                created_at: p.created_at.to_rfc3339(),
            })
            .collect(),
    }))
}

/// Poll wrapper response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPollWrapper {
    pub poll: PublicPollResponse,
}

/// Fetch a poll by join code (audience entry point).
async fn get_poll_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<ApiResponse<PublicPollWrapper>> {
    let poll = state.poll_service.get_by_code(&code).await?;

    Ok(ApiResponse::ok(PublicPollWrapper {
        poll: PublicPollResponse::from(&poll),
    }))
}

/// Fetch one of the creator's polls.
async fn get_poll(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state.poll_service.get_owned(&id, &user.id).await?;

    Ok(ApiResponse::ok(PollResponse::from(&poll)))
}

/// Update-poll request.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePollRequest {
    #[validate(length(min = 1, max = 256))]
    pub title: String,

    #[validate(length(min = 1, max = 512))]
    pub question: String,

    pub description: Option<String>,

    pub kind: PollKind,

    #[serde(default)]
    pub options: Vec<String>,

    pub is_live: Option<bool>,
}

/// Replace a poll's content.
async fn update_poll(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdatePollRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    req.validate()?;

    let poll = state
        .poll_service
        .update(
            &id,
            &user.id,
            UpdatePollInput {
                title: req.title,
                question: req.question,
                description: req.description,
                kind: req.kind,
                options: req.options,
                is_live: req.is_live,
            },
        )
        .await?;

    Ok(ApiResponse::ok(PollResponse::from(&poll)))
}

/// Liveness toggle request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLiveRequest {
    pub is_live: bool,
}

/// Toggle whether a poll accepts responses.
async fn set_live(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetLiveRequest>,
) -> AppResult<ApiResponse<PollResponse>> {
    let poll = state
        .poll_service
        .set_live(&id, &user.id, req.is_live)
        .await?;

    Ok(ApiResponse::ok(PollResponse::from(&poll)))
}

/// Deletion response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub ok: bool,
}

/// Delete a poll.
async fn delete_poll(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<DeleteResponse>> {
    state.poll_service.delete(&id, &user.id).await?;

    Ok(ApiResponse::ok(DeleteResponse { ok: true }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_poll).get(list_my_polls))
        .route("/overview", get(overview))
        .route("/code/{code}", get(get_poll_by_code))
        .route("/{id}", get(get_poll).patch(update_poll).delete(delete_poll))
        .route("/{id}/live", patch(set_live))
}
