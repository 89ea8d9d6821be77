//! Core business logic for pollpad.

pub mod services;

pub use services::*;
