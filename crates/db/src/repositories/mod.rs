//! Database repositories.

pub mod poll;
pub mod response;
pub mod user;

pub use poll::PollRepository;
pub use response::{NewResponse, ResponseRepository};
pub use user::UserRepository;
