//! Response ingestion and summary reading.
//!
//! This is the one place that writes to both the response detail rows and
//! the poll's denormalized counters, and the one place that reconciles them
//! on read when they disagree.

use std::collections::HashMap;

use pollpad_common::{AppError, AppResult, IdGenerator};
use pollpad_db::{
    entities::{
        poll::{self, PollKind},
        response,
    },
    repositories::{NewResponse, PollRepository, ResponseRepository},
};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::services::badge::{Badge, badge_for_count};

/// Stored user-agent strings are truncated to this length.
const MAX_USER_AGENT_LEN: usize = 200;

/// Upper bound on the respondent listing.
const RESPONDENT_LIMIT: u64 = 1000;

/// Default page size for response listings.
const DEFAULT_PAGE_SIZE: u64 = 20;

/// Maximum page size for response listings.
const MAX_PAGE_SIZE: u64 = 100;

/// Response service for business logic.
#[derive(Clone)]
pub struct ResponseService {
    poll_repo: PollRepository,
    response_repo: ResponseRepository,
    id_gen: IdGenerator,
    ip_hash_secret: String,
}

/// One audience submission, as it arrives at the boundary.
#[derive(Debug, Clone, Default)]
pub struct SubmitResponseInput {
    pub option_index: Option<i32>,
    pub text: Option<String>,
    pub name: String,
    pub email: String,
    pub audience_id: Option<String>,
    pub user_agent: Option<String>,
    pub client_ip: Option<String>,
}

/// Outcome of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionOutcome {
    /// `true` for a first-time response, `false` for a revision.
    pub created: bool,
}

/// Aggregated results for a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollSummary {
    Mcq { counts: Vec<i64>, total: i64 },
    Text { total: i64 },
}

/// One page of a poll's responses.
pub struct ResponsePage {
    pub items: Vec<response::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

/// A respondent row for the creator dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RespondentSummary {
    pub name: String,
    pub email: String,
    pub option_index: Option<i32>,
    pub text: Option<String>,
    pub last_submitted_at: chrono::DateTime<chrono::FixedOffset>,
    /// Responses across every poll, not just this one.
    pub total_responses: u64,
    pub badge: Badge,
}

impl ResponseService {
    /// Create a new response service.
    #[must_use]
    pub const fn new(
        poll_repo: PollRepository,
        response_repo: ResponseRepository,
        ip_hash_secret: String,
    ) -> Self {
        Self {
            poll_repo,
            response_repo,
            id_gen: IdGenerator::new(),
            ip_hash_secret,
        }
    }

    /// Record or revise an audience response against a join code.
    ///
    /// A respondent is identified by their normalized email; the
    /// `(poll, email)` uniqueness constraint makes the row upsert atomic and
    /// guarantees at most one row per respondent per poll. The prior-choice
    /// read and the counter delta are *not* transactional with the upsert:
    /// two concurrent revisions from the same respondent can read the same
    /// previous index and misapply the delta. That drift is tolerated by
    /// design and corrected on read by [`Self::recount`]; counter updates
    /// themselves are single atomic statements, so distinct respondents
    /// never lose updates to each other.
    ///
    /// All validation happens before any write; invalid input mutates
    /// nothing.
    pub async fn submit(
        &self,
        code: &str,
        input: SubmitResponseInput,
    ) -> AppResult<SubmissionOutcome> {
        let poll = self.poll_repo.get_by_code(code).await?;
        if !poll.is_live {
            return Err(AppError::NotLive);
        }

        let name = input.name.trim();
        let email = input.email.trim().to_lowercase();
        if name.is_empty() || email.is_empty() {
            return Err(AppError::Validation(
                "Name and email are required".to_string(),
            ));
        }

        let (option_index, text) = match poll.kind {
            PollKind::Mcq => {
                let options = poll.option_labels();
                let idx = input.option_index.ok_or_else(|| {
                    AppError::Validation("An option index is required".to_string())
                })?;
                if idx < 0 || idx as usize >= options.len() {
                    return Err(AppError::Validation("Invalid option index".to_string()));
                }
                (Some(idx), None)
            }
            PollKind::Text => {
                let text = input.text.as_deref().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    return Err(AppError::Validation("Text is required".to_string()));
                }
                (None, Some(text.to_string()))
            }
        };

        // Read the previous choice before the upsert; the delta below is
        // computed against it.
        let prev = self
            .response_repo
            .find_by_poll_and_email(&poll.id, &email)
            .await?;
        let prev_index = prev.as_ref().and_then(|r| r.option_index);

        let audience_id = input
            .audience_id
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(ToString::to_string);
        let user_agent = input
            .user_agent
            .map(|ua| ua.chars().take(MAX_USER_AGENT_LEN).collect());
        let ip_hash = input.client_ip.as_deref().map(|ip| self.hash_client_ip(ip));

        let created = self
            .response_repo
            .upsert_by_poll_and_email(NewResponse {
                id: self.id_gen.generate(),
                poll_id: poll.id.clone(),
                kind: poll.kind.clone(),
                option_index,
                text,
                name: name.to_string(),
                email,
                audience_id,
                ip_hash,
                user_agent,
                submitted_at: chrono::Utc::now().into(),
            })
            .await?;

        if created {
            self.poll_repo
                .apply_insert_counters(&poll.id, option_index)
                .await?;
        } else if poll.kind == PollKind::Mcq {
            if let (Some(prev_idx), Some(new_idx)) = (prev_index, option_index) {
                if prev_idx != new_idx {
                    self.poll_repo
                        .shift_option_count(&poll.id, prev_idx, new_idx)
                        .await?;
                }
            }
        }

        Ok(SubmissionOutcome { created })
    }

    /// Aggregated results for a poll, preferring the denormalized counters.
    ///
    /// For multiple choice, the counters are trusted only while they are
    /// shape-consistent with the option list; otherwise the detail rows are
    /// recounted. The poll row is never repaired in place.
    pub async fn summary(&self, poll: &poll::Model) -> AppResult<PollSummary> {
        match poll.kind {
            PollKind::Mcq => {
                let options = poll.option_labels();
                let counts = poll.counts();
                if counts.len() == options.len() {
                    return Ok(PollSummary::Mcq {
                        counts,
                        total: i64::from(poll.total_responses),
                    });
                }
                tracing::warn!(
                    poll_id = %poll.id,
                    "Denormalized counts lost shape; recounting from responses"
                );
                self.recount(poll).await
            }
            PollKind::Text => Ok(PollSummary::Text {
                total: i64::from(poll.total_responses),
            }),
        }
    }

    /// Aggregate from the detail rows, ignoring the denormalized counters.
    ///
    /// This is the authoritative correction path for counter drift.
    pub async fn recount(&self, poll: &poll::Model) -> AppResult<PollSummary> {
        match poll.kind {
            PollKind::Mcq => {
                let len = poll.option_labels().len();
                let rows = self
                    .response_repo
                    .find_by_poll_and_kind(&poll.id, PollKind::Mcq)
                    .await?;

                let mut counts = vec![0i64; len];
                for row in rows {
                    if let Some(idx) = row.option_index {
                        // Out-of-range indices (from an edited option list)
                        // are dropped rather than miscounted.
                        if idx >= 0 && (idx as usize) < len {
                            counts[idx as usize] += 1;
                        }
                    }
                }
                let total = counts.iter().sum();

                Ok(PollSummary::Mcq { counts, total })
            }
            PollKind::Text => {
                let total = self
                    .response_repo
                    .count_by_poll_and_kind(&poll.id, PollKind::Text)
                    .await?;
                Ok(PollSummary::Text {
                    total: total as i64,
                })
            }
        }
    }

    /// One page of a poll's responses, newest first, filtered to the poll's
    /// current kind.
    pub async fn list_responses(
        &self,
        poll: &poll::Model,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> AppResult<ResponsePage> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1) * limit;

        let items = self
            .response_repo
            .list_by_poll_and_kind(&poll.id, poll.kind.clone(), limit, offset)
            .await?;
        let total = self
            .response_repo
            .count_by_poll_and_kind(&poll.id, poll.kind.clone())
            .await?;

        Ok(ResponsePage {
            items,
            total,
            page,
            limit,
        })
    }

    /// Respondents for a poll with cross-poll badge tiers.
    ///
    /// The uniqueness constraint means each row here is one respondent.
    pub async fn respondents(&self, poll: &poll::Model) -> AppResult<Vec<RespondentSummary>> {
        let rows = self
            .response_repo
            .find_by_poll(&poll.id, RESPONDENT_LIMIT)
            .await?;

        let emails: Vec<String> = rows.iter().map(|r| r.email.clone()).collect();
        let mut totals: HashMap<String, u64> = HashMap::new();
        for row in self.response_repo.find_by_emails(&emails).await? {
            *totals.entry(row.email).or_default() += 1;
        }

        Ok(rows
            .into_iter()
            .map(|r| {
                let total = totals.get(&r.email).copied().unwrap_or(1);
                RespondentSummary {
                    name: r.name,
                    email: r.email,
                    option_index: r.option_index,
                    text: r.text,
                    last_submitted_at: r.updated_at.unwrap_or(r.created_at),
                    total_responses: total,
                    badge: badge_for_count(total),
                }
            })
            .collect())
    }

    /// Fingerprint a client IP without persisting it.
    fn hash_client_ip(&self, ip: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(ip.as_bytes());
        hasher.update(self.ip_hash_secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;
    use std::sync::Arc;

    fn mcq_poll(is_live: bool) -> poll::Model {
        poll::Model {
            id: "poll1".to_string(),
            title: "Best Snack".to_string(),
            question: "Which snack wins?".to_string(),
            description: None,
            kind: PollKind::Mcq,
            options: json!(["Chips", "Fruit", "Nuts"]),
            code: "123456".to_string(),
            is_live,
            created_by: "user1".to_string(),
            total_responses: 0,
            option_counts: json!([0, 0, 0]),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn text_poll() -> poll::Model {
        poll::Model {
            kind: PollKind::Text,
            options: json!([]),
            option_counts: json!([]),
            ..mcq_poll(true)
        }
    }

    fn prior_response(option_index: Option<i32>, kind: PollKind) -> response::Model {
        response::Model {
            id: "resp1".to_string(),
            poll_id: "poll1".to_string(),
            kind,
            option_index,
            text: None,
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            audience_id: None,
            ip_hash: None,
            user_agent: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn submission(option_index: Option<i32>, text: Option<&str>) -> SubmitResponseInput {
        SubmitResponseInput {
            option_index,
            text: text.map(ToString::to_string),
            name: "Ada".to_string(),
            email: "Ada@Example.com ".to_string(),
            ..Default::default()
        }
    }

    fn service(poll_db: MockDatabase, response_db: MockDatabase) -> ResponseService {
        ResponseService::new(
            PollRepository::new(Arc::new(poll_db.into_connection())),
            ResponseRepository::new(Arc::new(response_db.into_connection())),
            "test-secret".to_string(),
        )
    }

    fn upsert_result(created: bool) -> Vec<std::collections::BTreeMap<&'static str, sea_orm::Value>> {
        vec![maplit::btreemap! {
            "created" => sea_orm::Value::Bool(Some(created))
        }]
    }

    #[tokio::test]
    async fn test_submit_unknown_code_fails() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<poll::Model>::new()]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(poll_db, response_db)
            .submit("000000", submission(Some(0), None))
            .await;

        assert!(matches!(result, Err(AppError::PollNotFound)));
    }

    #[tokio::test]
    async fn test_submit_to_closed_poll_fails() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(false)]]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(poll_db, response_db)
            .submit("123456", submission(Some(0), None))
            .await;

        assert!(matches!(result, Err(AppError::NotLive)));
    }

    #[tokio::test]
    async fn test_submit_requires_name_and_email() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]]);
        // No response-store results mocked: any write attempt would error.
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let mut input = submission(Some(0), None);
        input.name = "   ".to_string();

        let result = service(poll_db, response_db).submit("123456", input).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_index_rejected_without_mutation() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]]);
        // Neither store may be touched after validation fails.
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(poll_db, response_db)
            .submit("123456", submission(Some(3), None))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_mcq_submission_requires_index() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(poll_db, response_db)
            .submit("123456", submission(None, None))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_text_submission_requires_text() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[text_poll()]]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let result = service(poll_db, response_db)
            .submit("123456", submission(None, Some("   ")))
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_first_submission_reports_created_and_bumps_counters() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<response::Model>::new()])
            .append_query_results([upsert_result(true)]);

        let outcome = service(poll_db, response_db)
            .submit("123456", submission(Some(0), None))
            .await
            .unwrap();

        assert!(outcome.created);
    }

    #[tokio::test]
    async fn test_revision_to_new_index_shifts_counters() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![prior_response(Some(0), PollKind::Mcq)]])
            .append_query_results([upsert_result(false)]);

        let outcome = service(poll_db, response_db)
            .submit("123456", submission(Some(2), None))
            .await
            .unwrap();

        assert!(!outcome.created);
    }

    #[tokio::test]
    async fn test_revision_to_same_index_touches_no_counters() {
        // The poll store has no exec result mocked; a counter update would
        // surface as a Database error.
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[mcq_poll(true)]]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![prior_response(Some(1), PollKind::Mcq)]])
            .append_query_results([upsert_result(false)]);

        let outcome = service(poll_db, response_db)
            .submit("123456", submission(Some(1), None))
            .await
            .unwrap();

        assert!(!outcome.created);
    }

    #[tokio::test]
    async fn test_text_revision_touches_no_counters() {
        let poll_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[text_poll()]]);
        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![prior_response(None, PollKind::Text)]])
            .append_query_results([upsert_result(false)]);

        let outcome = service(poll_db, response_db)
            .submit("123456", submission(None, Some("great snacks")))
            .await
            .unwrap();

        assert!(!outcome.created);
    }

    #[tokio::test]
    async fn test_summary_prefers_denormalized_counters() {
        let mut poll = mcq_poll(true);
        poll.option_counts = json!([1, 2, 0]);
        poll.total_responses = 3;

        let poll_db = MockDatabase::new(DatabaseBackend::Postgres);
        // No detail-row query should be needed.
        let response_db = MockDatabase::new(DatabaseBackend::Postgres);

        let summary = service(poll_db, response_db).summary(&poll).await.unwrap();

        assert_eq!(
            summary,
            PollSummary::Mcq {
                counts: vec![1, 2, 0],
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_summary_falls_back_when_counts_lose_shape() {
        let mut poll = mcq_poll(true);
        // An edited option list left the counters at the wrong length.
        poll.option_counts = json!([1, 2]);

        let rows = vec![
            prior_response(Some(0), PollKind::Mcq),
            prior_response(Some(1), PollKind::Mcq),
            prior_response(Some(1), PollKind::Mcq),
            // Stale row pointing past the current option list.
            prior_response(Some(7), PollKind::Mcq),
        ];

        let poll_db = MockDatabase::new(DatabaseBackend::Postgres);
        let response_db =
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([rows]);

        let summary = service(poll_db, response_db).summary(&poll).await.unwrap();

        assert_eq!(
            summary,
            PollSummary::Mcq {
                counts: vec![1, 2, 0],
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_recount_matches_denormalized_when_no_drift() {
        let mut poll = mcq_poll(true);
        poll.option_counts = json!([1, 2, 0]);
        poll.total_responses = 3;

        let rows = vec![
            prior_response(Some(0), PollKind::Mcq),
            prior_response(Some(1), PollKind::Mcq),
            prior_response(Some(1), PollKind::Mcq),
        ];

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([rows]),
        );

        let denormalized = svc.summary(&poll).await.unwrap();
        let recounted = svc.recount(&poll).await.unwrap();

        assert_eq!(denormalized, recounted);
    }

    #[tokio::test]
    async fn test_text_summary_uses_denormalized_total() {
        let mut poll = text_poll();
        poll.total_responses = 4;

        let svc = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );

        let summary = svc.summary(&poll).await.unwrap();

        assert_eq!(summary, PollSummary::Text { total: 4 });
    }

    #[tokio::test]
    async fn test_list_responses_clamps_pagination() {
        let poll = mcq_poll(true);

        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<response::Model>::new()])
            .append_query_results([vec![maplit::btreemap! {
                "num_items" => sea_orm::Value::BigInt(Some(0))
            }]]);

        let page = service(MockDatabase::new(DatabaseBackend::Postgres), response_db)
            .list_responses(&poll, Some(0), Some(1000))
            .await
            .unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
        assert_eq!(page.total, 0);
    }

    #[tokio::test]
    async fn test_respondents_carry_cross_poll_badges() {
        let poll = mcq_poll(true);

        let in_poll = vec![prior_response(Some(0), PollKind::Mcq)];
        // The same respondent answered two other polls as well.
        let everywhere = vec![
            prior_response(Some(0), PollKind::Mcq),
            response::Model {
                poll_id: "poll2".to_string(),
                ..prior_response(Some(1), PollKind::Mcq)
            },
            response::Model {
                poll_id: "poll3".to_string(),
                ..prior_response(None, PollKind::Text)
            },
        ];

        let response_db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([in_poll])
            .append_query_results([everywhere]);

        let respondents = service(MockDatabase::new(DatabaseBackend::Postgres), response_db)
            .respondents(&poll)
            .await
            .unwrap();

        assert_eq!(respondents.len(), 1);
        assert_eq!(respondents[0].total_responses, 3);
        assert_eq!(respondents[0].badge, Badge::Bronze);
    }

    #[test]
    fn test_ip_fingerprint_is_stable_and_secret_dependent() {
        let svc_a = service(
            MockDatabase::new(DatabaseBackend::Postgres),
            MockDatabase::new(DatabaseBackend::Postgres),
        );
        let svc_b = ResponseService::new(
            PollRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            ResponseRepository::new(Arc::new(
                MockDatabase::new(DatabaseBackend::Postgres).into_connection(),
            )),
            "other-secret".to_string(),
        );

        let a1 = svc_a.hash_client_ip("203.0.113.9");
        let a2 = svc_a.hash_client_ip("203.0.113.9");
        let b = svc_b.hash_client_ip("203.0.113.9");

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert_eq!(a1.len(), 64);
    }
}
