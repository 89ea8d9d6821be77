//! Response repository.

use std::sync::Arc;

use crate::entities::{Response, poll::PollKind, response};
use pollpad_common::{AppError, AppResult};
use sea_orm::{
    ActiveEnum, ColumnTrait, ConnectionTrait, DatabaseBackend, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Statement,
};

/// Fields written by the ingestion upsert.
#[derive(Debug, Clone)]
pub struct NewResponse {
    pub id: String,
    pub poll_id: String,
    pub kind: PollKind,
    pub option_index: Option<i32>,
    pub text: Option<String>,
    pub name: String,
    pub email: String,
    pub audience_id: Option<String>,
    pub ip_hash: Option<String>,
    pub user_agent: Option<String>,
    pub submitted_at: chrono::DateTime<chrono::FixedOffset>,
}

/// Response repository for database operations.
#[derive(Clone)]
pub struct ResponseRepository {
    db: Arc<DatabaseConnection>,
}

impl ResponseRepository {
    /// Create a new response repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a respondent's response for a poll (expects a normalized email).
    pub async fn find_by_poll_and_email(
        &self,
        poll_id: &str,
        email: &str,
    ) -> AppResult<Option<response::Model>> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .filter(response::Column::Email.eq(email))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert or overwrite the response row keyed by (poll, email) in one
    /// atomic statement, relying on the `idx_response_poll_email` uniqueness
    /// constraint. Returns `true` when a row was inserted, `false` when an
    /// existing row was overwritten; `created_at` survives overwrites.
    ///
    /// `xmax = 0` distinguishes a fresh insert from a conflict-update on
    /// `PostgreSQL`; the flag comes back from the same statement that wrote
    /// the row, so no separate existence check is needed.
    pub async fn upsert_by_poll_and_email(&self, row: NewResponse) -> AppResult<bool> {
        let stmt = Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"
            INSERT INTO "response"
                ("id", "poll_id", "kind", "option_index", "text", "name", "email",
                 "audience_id", "ip_hash", "user_agent", "created_at")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT ("poll_id", "email") DO UPDATE SET
                "kind" = EXCLUDED."kind",
                "option_index" = EXCLUDED."option_index",
                "text" = EXCLUDED."text",
                "name" = EXCLUDED."name",
                "audience_id" = COALESCE(EXCLUDED."audience_id", "response"."audience_id"),
                "ip_hash" = EXCLUDED."ip_hash",
                "user_agent" = EXCLUDED."user_agent",
                "updated_at" = EXCLUDED."created_at"
            RETURNING (xmax = 0) AS "created"
            "#,
            [
                row.id.into(),
                row.poll_id.into(),
                row.kind.to_value().into(),
                row.option_index.into(),
                row.text.into(),
                row.name.into(),
                row.email.into(),
                row.audience_id.into(),
                row.ip_hash.into(),
                row.user_agent.into(),
                row.submitted_at.into(),
            ],
        );

        let result = self
            .db
            .query_one(stmt)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::Database("Response upsert returned no row".to_string()))?;

        result
            .try_get::<bool>("", "created")
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All responses for a poll, newest first, bounded.
    pub async fn find_by_poll(&self, poll_id: &str, limit: u64) -> AppResult<Vec<response::Model>> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .order_by_desc(response::Column::CreatedAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Responses of a given kind for a poll, newest first, paginated.
    pub async fn list_by_poll_and_kind(
        &self,
        poll_id: &str,
        kind: PollKind,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<response::Model>> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .filter(response::Column::Kind.eq(kind))
            .order_by_desc(response::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All responses of a given kind for a poll, unbounded.
    ///
    /// Feeds the from-scratch recount path, which must see every row.
    pub async fn find_by_poll_and_kind(
        &self,
        poll_id: &str,
        kind: PollKind,
    ) -> AppResult<Vec<response::Model>> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .filter(response::Column::Kind.eq(kind))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count responses of a given kind for a poll.
    pub async fn count_by_poll_and_kind(&self, poll_id: &str, kind: PollKind) -> AppResult<u64> {
        Response::find()
            .filter(response::Column::PollId.eq(poll_id))
            .filter(response::Column::Kind.eq(kind))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All responses from the given respondents, across every poll.
    ///
    /// Used for cross-poll badge totals.
    pub async fn find_by_emails(&self, emails: &[String]) -> AppResult<Vec<response::Model>> {
        if emails.is_empty() {
            return Ok(vec![]);
        }

        Response::find()
            .filter(response::Column::Email.is_in(emails.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
