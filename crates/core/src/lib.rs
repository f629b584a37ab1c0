//! Core business logic for foodgram.
//!
//! Services sit between the HTTP layer and the repositories. They take plain
//! user IDs; role checks happen in the API layer.

pub mod services;

pub use services::*;
