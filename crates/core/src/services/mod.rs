//! Business logic services.

#![allow(missing_docs)]

pub mod badge;
pub mod poll;
pub mod response;
pub mod user;

pub use badge::{Badge, badge_for_count};
pub use poll::{CreatePollInput, PollOverview, PollService, UpdatePollInput};
pub use response::{
    PollSummary, RespondentSummary, ResponsePage, ResponseService, SubmissionOutcome,
    SubmitResponseInput,
};
pub use user::{SignupInput, UserService};
