//! Database entities.

pub mod poll;
pub mod response;
pub mod user;

pub use poll::Entity as Poll;
pub use response::Entity as Response;
pub use user::Entity as User;
