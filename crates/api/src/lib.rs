//! HTTP API layer for foodgram.
//!
//! This crate provides the REST API served under `/api`:
//!
//! - **Endpoints**: users, auth tokens, tags, ingredients, recipes and the
//!   shopping list download
//! - **Extractors**: authenticated, active (not blocked) and admin callers
//! - **Middleware**: token authentication
//! - **Responses**: paginated lists and file attachments
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
