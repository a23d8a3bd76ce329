//! HTTP API surface.

#![allow(dead_code)]

pub mod error;
pub mod handlers;
pub mod routes;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use handlers::{AppState, SharedState};
pub use routes::create_router;
