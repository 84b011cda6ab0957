use std::sync::Arc;

pub mod auth;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod routes;
pub mod sentiment;
pub mod storage;

use auth::AuthService;
use config::AppConfig;
use pipeline::{DocumentCatalog, IngestionPipeline};
use sentiment::SentimentEngine;
use storage::{FeedbackStore, UserStore};

/// Shared handler state; everything is constructed once at startup and
/// passed down explicitly.
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<UserStore>,
    pub feedback: Arc<FeedbackStore>,
    pub auth: Arc<AuthService>,
    pub pipeline: Arc<IngestionPipeline>,
    pub catalog: Arc<DocumentCatalog>,
    pub sentiment: Arc<SentimentEngine>,
}
