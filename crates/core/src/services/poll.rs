//! Poll service.

use chrono::Utc;
use pollpad_common::{AppError, AppResult, IdGenerator};
use pollpad_db::{
    entities::poll::{self, PollKind},
    repositories::PollRepository,
};
use rand::Rng;
use sea_orm::Set;
use serde_json::json;

/// Maximum attempts to find a free join code before giving up.
const MAX_CODE_ATTEMPTS: u32 = 5;

/// Maximum number of options on a multiple-choice poll.
const MAX_OPTIONS: usize = 10;

/// Maximum length of a single option label.
const MAX_OPTION_LEN: usize = 100;

/// How many polls the dashboard overview lists.
const OVERVIEW_RECENT_LIMIT: u64 = 5;

/// Poll service for business logic.
#[derive(Clone)]
pub struct PollService {
    poll_repo: PollRepository,
    id_gen: IdGenerator,
}

/// Input for creating a poll.
pub struct CreatePollInput {
    pub title: String,
    pub question: String,
    pub description: Option<String>,
    pub kind: PollKind,
    pub options: Vec<String>,
}

/// Input for updating a poll's content.
pub struct UpdatePollInput {
    pub title: String,
    pub question: String,
    pub description: Option<String>,
    pub kind: PollKind,
    pub options: Vec<String>,
    pub is_live: Option<bool>,
}

/// Dashboard overview counters for a creator.
pub struct PollOverview {
    pub total_polls: u64,
    pub live_polls: u64,
    pub closed_polls: u64,
    pub total_responses: i64,
    pub recent: Vec<poll::Model>,
}

impl PollService {
    /// Create a new poll service.
    #[must_use]
    pub const fn new(poll_repo: PollRepository) -> Self {
        Self {
            poll_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a poll owned by `owner_id`.
    ///
    /// New polls start with `is_live = false` and zeroed counters sized to
    /// the option list.
    pub async fn create(&self, owner_id: &str, input: CreatePollInput) -> AppResult<poll::Model> {
        let (title, question, description) = validate_titles(
            &input.title,
            &input.question,
            input.description.as_deref(),
        )?;
        let options = validate_options(input.kind.clone(), input.options)?;

        let code = self.allocate_code().await?;

        let model = poll::ActiveModel {
            id: Set(self.id_gen.generate()),
            title: Set(title),
            question: Set(question),
            description: Set(description),
            kind: Set(input.kind),
            options: Set(json!(options)),
            code: Set(code),
            is_live: Set(false),
            created_by: Set(owner_id.to_string()),
            total_responses: Set(0),
            option_counts: Set(json!(vec![0i32; options.len()])),
            ..Default::default()
        };

        self.poll_repo.create(model).await
    }

    /// List a creator's polls, newest first.
    pub async fn list_mine(&self, owner_id: &str) -> AppResult<Vec<poll::Model>> {
        self.poll_repo.find_by_owner(owner_id, None).await
    }

    /// Get a poll by ID, owner-scoped.
    pub async fn get_owned(&self, id: &str, owner_id: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_owned(id, owner_id).await
    }

    /// Get a poll by join code (public lookup).
    pub async fn get_by_code(&self, code: &str) -> AppResult<poll::Model> {
        self.poll_repo.get_by_code(code).await
    }

    /// Replace a poll's content.
    ///
    /// Counters are deliberately left untouched; if the option list changes
    /// shape, summaries fall back to recounting the detail rows.
    pub async fn update(
        &self,
        id: &str,
        owner_id: &str,
        input: UpdatePollInput,
    ) -> AppResult<poll::Model> {
        let (title, question, description) = validate_titles(
            &input.title,
            &input.question,
            input.description.as_deref(),
        )?;
        let options = validate_options(input.kind.clone(), input.options)?;

        let poll = self.poll_repo.get_owned(id, owner_id).await?;
        let mut active: poll::ActiveModel = poll.into();

        active.title = Set(title);
        active.question = Set(question);
        active.description = Set(description);
        active.kind = Set(input.kind);
        active.options = Set(json!(options));
        if let Some(is_live) = input.is_live {
            active.is_live = Set(is_live);
        }
        active.updated_at = Set(Some(Utc::now().into()));

        self.poll_repo.update(active).await
    }

    /// Toggle whether a poll accepts responses.
    pub async fn set_live(&self, id: &str, owner_id: &str, is_live: bool) -> AppResult<poll::Model> {
        let poll = self.poll_repo.get_owned(id, owner_id).await?;
        let mut active: poll::ActiveModel = poll.into();

        active.is_live = Set(is_live);
        active.updated_at = Set(Some(Utc::now().into()));

        self.poll_repo.update(active).await
    }

    /// Delete a poll; responses go with it.
    pub async fn delete(&self, id: &str, owner_id: &str) -> AppResult<()> {
        if !self.poll_repo.delete_owned(id, owner_id).await? {
            return Err(AppError::PollNotFound);
        }
        Ok(())
    }

    /// Dashboard overview for a creator.
    pub async fn overview(&self, owner_id: &str) -> AppResult<PollOverview> {
        let total_polls = self.poll_repo.count_by_owner(owner_id, None).await?;
        let live_polls = self.poll_repo.count_by_owner(owner_id, Some(true)).await?;
        let closed_polls = self.poll_repo.count_by_owner(owner_id, Some(false)).await?;
        let total_responses = self.poll_repo.sum_responses_by_owner(owner_id).await?;
        let recent = self
            .poll_repo
            .find_by_owner(owner_id, Some(OVERVIEW_RECENT_LIMIT))
            .await?;

        Ok(PollOverview {
            total_polls,
            live_polls,
            closed_polls,
            total_responses,
            recent,
        })
    }

    /// Allocate an unused 6-digit join code, retrying on collision.
    async fn allocate_code(&self) -> AppResult<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = random_code();
            if self.poll_repo.find_by_code(&code).await?.is_none() {
                return Ok(code);
            }
        }
        Err(AppError::Internal(
            "Failed to allocate a unique join code".to_string(),
        ))
    }
}

/// A random 6-digit join code (no leading zero).
fn random_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..1_000_000).to_string()
}

fn validate_titles(
    title: &str,
    question: &str,
    description: Option<&str>,
) -> AppResult<(String, String, Option<String>)> {
    let title = title.trim();
    let question = question.trim();

    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if question.is_empty() {
        return Err(AppError::BadRequest("Question is required".to_string()));
    }

    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(ToString::to_string);

    Ok((title.to_string(), question.to_string(), description))
}

/// Sanitize and validate option labels for the poll kind.
///
/// Text polls always end up with an empty option list.
fn validate_options(kind: PollKind, options: Vec<String>) -> AppResult<Vec<String>> {
    match kind {
        PollKind::Text => Ok(vec![]),
        PollKind::Mcq => {
            let options: Vec<String> = options
                .into_iter()
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();

            if options.len() < 2 {
                return Err(AppError::BadRequest(
                    "Multiple-choice polls need at least 2 options".to_string(),
                ));
            }
            if options.len() > MAX_OPTIONS {
                return Err(AppError::BadRequest(format!(
                    "Multiple-choice polls cannot have more than {MAX_OPTIONS} options"
                )));
            }
            if options.iter().any(|o| o.len() > MAX_OPTION_LEN) {
                return Err(AppError::BadRequest(format!(
                    "Option labels are limited to {MAX_OPTION_LEN} characters"
                )));
            }

            Ok(options)
        }
    }
}
