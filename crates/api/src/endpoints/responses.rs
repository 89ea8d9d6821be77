//! Response submission and summary endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, header},
    routing::{get, post},
};
use pollpad_common::AppResult;
use pollpad_core::{PollSummary, RespondentSummary, SubmitResponseInput};
use pollpad_db::entities::{poll::PollKind, response};
use serde::{Deserialize, Serialize};

use crate::{extractors::CreatorUser, middleware::AppState, response::ApiResponse};

/// Audience submission request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub option_index: Option<i32>,
    pub text: Option<String>,
    pub name: String,
    pub email: String,
    pub audience_id: Option<String>,
}

/// Submission result.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    /// `true` when a new response was recorded, `false` when an existing
    /// one was revised.
    pub created: bool,
}

fn header_string(headers: &HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// First hop of the `X-Forwarded-For` chain, if the proxy supplied one.
fn forwarded_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Submit a response against a join code (no authentication).
///
/// Returns 201 for a newly recorded response, 200 for a revision.
async fn submit_response(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SubmitRequest>,
) -> AppResult<ApiResponse<SubmitResult>> {
    let input = SubmitResponseInput {
        option_index: req.option_index,
        text: req.text,
        name: req.name,
        email: req.email,
        audience_id: req.audience_id,
        user_agent: header_string(&headers, header::USER_AGENT),
        client_ip: forwarded_ip(&headers),
    };

    let outcome = state.response_service.submit(&code, input).await?;
    let result = SubmitResult {
        created: outcome.created,
    };

    Ok(if outcome.created {
        ApiResponse::created(result)
    } else {
        ApiResponse::ok(result)
    })
}

/// Aggregated summary response.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResponse {
    pub kind: PollKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<Vec<i64>>,
    pub total: i64,
}

impl From<PollSummary> for SummaryResponse {
    fn from(summary: PollSummary) -> Self {
        match summary {
            PollSummary::Mcq { counts, total } => Self {
                kind: PollKind::Mcq,
                counts: Some(counts),
                total,
            },
            PollSummary::Text { total } => Self {
                kind: PollKind::Text,
                counts: None,
                total,
            },
        }
    }
}

/// Public summary by join code.
async fn public_summary(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> AppResult<ApiResponse<SummaryResponse>> {
    let poll = state.poll_service.get_by_code(&code).await?;
    let summary = state.response_service.summary(&poll).await?;

    Ok(ApiResponse::ok(SummaryResponse::from(summary)))
}

/// Creator summary, owner-scoped.
async fn creator_summary(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<SummaryResponse>> {
    let poll = state.poll_service.get_owned(&id, &user.id).await?;
    let summary = state.response_service.summary(&poll).await?;

    Ok(ApiResponse::ok(SummaryResponse::from(summary)))
}

/// Pagination query.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

/// One response row in a listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseItem {
    pub id: String,
    pub kind: PollKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_index: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub name: String,
    pub email: String,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl From<&response::Model> for ResponseItem {
    fn from(r: &response::Model) -> Self {
        Self {
            id: r.id.clone(),
            kind: r.kind.clone(),
            option_index: r.option_index,
            text: r.text.clone(),
            name: r.name.clone(),
            email: r.email.clone(),
            created_at: r.created_at.to_rfc3339(),
            updated_at: r.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// Paginated response listing.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseListResponse {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub items: Vec<ResponseItem>,
}

/// List a poll's responses, newest first (creator only).
async fn list_responses(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<ResponseListResponse>> {
    let poll = state.poll_service.get_owned(&id, &user.id).await?;
    let page = state
        .response_service
        .list_responses(&poll, query.page, query.limit)
        .await?;

    Ok(ApiResponse::ok(ResponseListResponse {
        total: page.total,
        page: page.page,
        limit: page.limit,
        items: page.items.iter().map(ResponseItem::from).collect(),
    }))
}

/// Respondents for a poll with cross-poll badges (creator only).
async fn list_respondents(
    CreatorUser(user): CreatorUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<RespondentSummary>>> {
    let poll = state.poll_service.get_owned(&id, &user.id).await?;
    let respondents = state.response_service.respondents(&poll).await?;

    Ok(ApiResponse::ok(respondents))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/code/{code}/summary", get(public_summary))
        .route("/{id}/summary", get(creator_summary))
        .route("/{id}/responses", get(list_responses).post(submit_response))
        .route("/{id}/respondents", get(list_respondents))
}
