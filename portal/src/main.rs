use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{Router, extract::DefaultBodyLimit, routing::get};
use dotenvy::dotenv;
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use portal::{
    AppState,
    auth::{AuthService, hash_password},
    config::{self, AuthConfig},
    pipeline::{
        DocumentCatalog, DocumentTextExtractor, IngestionPipeline, PopplerRenderer,
        TesseractEngine,
    },
    sentiment::SentimentEngine,
    storage::{
        DocumentStore, FeedbackStore, JsonDocumentStore, JsonTableConfig, JsonTableStorage,
        NewUserRecord, StorageManager, UserRole, UserStore,
    },
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "Server crashed");
        eprintln!("Server crashed: {err}");
    }
}

async fn run() -> Result<()> {
    init_tracing();
    dotenv().ok();

    let config = config::load()
        .await
        .context("Failed to load application configuration")?;

    let data_dir = PathBuf::from(&config.storage.data_dir);
    let upload_dir = PathBuf::from(&config.storage.upload_dir);
    let text_dir = PathBuf::from(&config.storage.extracted_text_dir);

    let users_table = Arc::new(JsonTableStorage::new(JsonTableConfig {
        data_dir: data_dir.clone(),
        table: "users".into(),
    }));
    let feedback_table = Arc::new(JsonTableStorage::new(JsonTableConfig {
        data_dir: data_dir.clone(),
        table: "feedback".into(),
    }));
    let documents = Arc::new(JsonDocumentStore::new(data_dir.clone()));

    let mut storage_manager = StorageManager::new();
    storage_manager.register_record(users_table.clone());
    storage_manager.register_record(feedback_table.clone());
    storage_manager.register_documents(documents.clone());
    storage_manager.initialize_all().await?;

    let users = Arc::new(UserStore::new(users_table));
    let feedback = Arc::new(FeedbackStore::new(feedback_table));
    seed_admin(&users, &config.auth).await?;

    let command_timeout = Duration::from_secs(config.ocr.command_timeout_secs);
    let extractor = DocumentTextExtractor::new(
        Arc::new(TesseractEngine::new(
            config.ocr.language.clone(),
            command_timeout,
        )),
        Arc::new(PopplerRenderer::new(config.ocr.render_dpi, command_timeout)),
    );

    let document_store: Arc<dyn DocumentStore> = documents;
    let pipeline = Arc::new(
        IngestionPipeline::new(
            upload_dir,
            text_dir,
            extractor,
            document_store.clone(),
            config.ocr.max_concurrent_extractions,
        )
        .await?,
    );
    let catalog = Arc::new(DocumentCatalog::new(document_store));

    let state = Arc::new(AppState {
        config: Arc::new(config.clone()),
        users,
        feedback,
        auth: Arc::new(AuthService::new(&config.auth)),
        pipeline,
        catalog,
        sentiment: Arc::new(SentimentEngine::new()),
    });

    let addr_string = format!("{}:{}", config.server.host, config.server.port);
    let addr = addr_string
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid server address: {addr_string}"))?;
    info!(host = %config.server.host, port = config.server.port, "Loaded configuration");

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .nest("/api/v1", portal::routes::api_routes())
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(cors)
        .with_state(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!(%addr, "Portal server listening");

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Err(err) = storage_manager.finalize_all().await {
        warn!(error = %err, "Failed to finalize storages");
    }

    server_result.context("Server encountered a fatal error")?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

/// A fresh deployment always has the configured admin account.
async fn seed_admin(users: &UserStore, auth_config: &AuthConfig) -> Result<()> {
    if users
        .find_by_email(&auth_config.admin_email)
        .await?
        .is_some()
    {
        return Ok(());
    }

    users
        .create(NewUserRecord {
            email: auth_config.admin_email.clone(),
            username: auth_config.admin_username.clone(),
            full_name: auth_config.admin_full_name.clone(),
            password: hash_password(&auth_config.admin_password),
            role: UserRole::Admin,
            is_active: true,
        })
        .await?;
    users.persist().await?;

    info!(email = %auth_config.admin_email, "admin user seeded");
    Ok(())
}

async fn root() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "message": "Welcome to the Campus Portal API" }))
}

#[inline]
async fn health() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                if stream.recv().await.is_some() {
                    info!("Received SIGTERM");
                }
            }
            Err(err) => warn!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received termination signal (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received termination signal (SIGTERM)");
        }
    }
}
