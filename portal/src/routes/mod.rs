use std::sync::Arc;

use axum::Router;

use crate::AppState;

pub mod documents;
pub mod feedback;
pub mod types;
pub mod users;

pub use documents::document_routes;
pub use feedback::feedback_routes;
pub use users::user_routes;

/// All versioned API routes, nested under `/api/v1` by the caller.
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(document_routes())
        .merge(user_routes())
        .merge(feedback_routes())
}
