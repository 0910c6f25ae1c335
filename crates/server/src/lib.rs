//! Stevedore push coordination server.
//!
//! Exposes a stateless push endpoint that reconciles client manifests
//! against object storage and answers with presigned upload requirements.

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod push;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use push::Coordinator;
pub use routes::create_router;
pub use state::AppState;
