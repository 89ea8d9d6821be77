//! Poll repository.

use std::sync::Arc;

use crate::entities::{Poll, poll};
use pollpad_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, sea_query::Expr,
};

/// Poll repository for database operations.
#[derive(Clone)]
pub struct PollRepository {
    db: Arc<DatabaseConnection>,
}

impl PollRepository {
    /// Create a new poll repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a poll by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<poll::Model>> {
        Poll::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a poll by join code.
    pub async fn find_by_code(&self, code: &str) -> AppResult<Option<poll::Model>> {
        Poll::find()
            .filter(poll::Column::Code.eq(code))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a poll by join code, returning an error if not found.
    pub async fn get_by_code(&self, code: &str) -> AppResult<poll::Model> {
        self.find_by_code(code)
            .await?
            .ok_or(AppError::PollNotFound)
    }

    /// Get a poll by ID scoped to its owner, returning an error if not found.
    ///
    /// Creator endpoints use this so a creator can never see or mutate
    /// another creator's poll.
    pub async fn get_owned(&self, id: &str, owner_id: &str) -> AppResult<poll::Model> {
        Poll::find_by_id(id)
            .filter(poll::Column::CreatedBy.eq(owner_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or(AppError::PollNotFound)
    }

    /// List a creator's polls, newest first.
    pub async fn find_by_owner(&self, owner_id: &str, limit: Option<u64>) -> AppResult<Vec<poll::Model>> {
        let mut query = Poll::find()
            .filter(poll::Column::CreatedBy.eq(owner_id))
            .order_by_desc(poll::Column::CreatedAt);

        if let Some(limit) = limit {
            query = query.limit(limit);
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count a creator's polls, optionally filtered by liveness.
    pub async fn count_by_owner(&self, owner_id: &str, is_live: Option<bool>) -> AppResult<u64> {
        let mut query = Poll::find().filter(poll::Column::CreatedBy.eq(owner_id));

        if let Some(live) = is_live {
            query = query.filter(poll::Column::IsLive.eq(live));
        }

        query
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Sum the denormalized response totals across a creator's polls.
    pub async fn sum_responses_by_owner(&self, owner_id: &str) -> AppResult<i64> {
        let total: Option<Option<i64>> = Poll::find()
            .select_only()
            .column_as(poll::Column::TotalResponses.sum(), "total")
            .filter(poll::Column::CreatedBy.eq(owner_id))
            .into_tuple()
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(total.flatten().unwrap_or(0))
    }

    /// Create a new poll.
    pub async fn create(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a poll.
    pub async fn update(&self, model: poll::ActiveModel) -> AppResult<poll::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a poll scoped to its owner. Returns whether a row was deleted.
    pub async fn delete_owned(&self, id: &str, owner_id: &str) -> AppResult<bool> {
        let result = Poll::delete_many()
            .filter(poll::Column::Id.eq(id))
            .filter(poll::Column::CreatedBy.eq(owner_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Apply first-submission counter deltas atomically (single UPDATE,
    /// no fetch): `total_responses` +1, and for mcq the submitted option's
    /// slot +1.
    pub async fn apply_insert_counters(
        &self,
        poll_id: &str,
        option_index: Option<i32>,
    ) -> AppResult<()> {
        let mut update = Poll::update_many().col_expr(
            poll::Column::TotalResponses,
            Expr::col(poll::Column::TotalResponses).add(1),
        );

        if let Some(idx) = option_index {
            update = update.col_expr(
                poll::Column::OptionCounts,
                Expr::cust_with_values(
                    "jsonb_set(option_counts, ARRAY[?::text], \
                     to_jsonb(COALESCE((option_counts->>?)::int, 0) + 1))",
                    [idx, idx],
                ),
            );
        }

        update
            .filter(poll::Column::Id.eq(poll_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    /// Move one vote between option slots atomically (single UPDATE, no
    /// fetch): `option_counts[prev]` -1 (floored at 0), `option_counts[next]`
    /// +1. `total_responses` is left untouched.
    pub async fn shift_option_count(
        &self,
        poll_id: &str,
        prev_index: i32,
        next_index: i32,
    ) -> AppResult<()> {
        Poll::update_many()
            .col_expr(
                poll::Column::OptionCounts,
                Expr::cust_with_values(
                    "jsonb_set(jsonb_set(option_counts, ARRAY[?::text], \
                     to_jsonb(GREATEST(COALESCE((option_counts->>?)::int, 0) - 1, 0))), \
                     ARRAY[?::text], to_jsonb(COALESCE((option_counts->>?)::int, 0) + 1))",
                    [prev_index, prev_index, next_index, next_index],
                ),
            )
            .filter(poll::Column::Id.eq(poll_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}
