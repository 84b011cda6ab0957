use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::info;

const DEFAULT_CONFIG_PATH: &str = "config/app.yaml";
const SECRET_KEY_ENV: &str = "PORTAL_SECRET_KEY";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the JSON record tables and document metadata.
    pub data_dir: String,
    /// Directory receiving raw uploaded binaries.
    pub upload_dir: String,
    /// Directory receiving extracted text files.
    pub extracted_text_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: String,
    pub token_ttl_minutes: i64,
    pub admin_email: String,
    pub admin_username: String,
    pub admin_full_name: String,
    pub admin_password: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "dev-secret-change-me".to_string(),
            token_ttl_minutes: 30,
            admin_email: "admin@campus-portal.local".to_string(),
            admin_username: "admin".to_string(),
            admin_full_name: "Administrator".to_string(),
            admin_password: "admin123".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Recognition language passed to the OCR engine; no auto-detection.
    pub language: String,
    /// Resolution for rendering document pages before recognition.
    pub render_dpi: u32,
    /// Upper bound for a single render or recognition subprocess.
    pub command_timeout_secs: u64,
    /// Extractions beyond this run queue on the semaphore.
    pub max_concurrent_extractions: usize,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            render_dpi: 300,
            command_timeout_secs: 120,
            max_concurrent_extractions: 4,
        }
    }
}

/// Load the application configuration from disk, applying environment
/// overrides. The token secret can be supplied via `PORTAL_SECRET_KEY` so
/// it never has to live in the config file.
pub async fn load() -> Result<AppConfig> {
    let path = config_path();
    let contents = fs::read_to_string(&path)
        .await
        .with_context(|| format!("Failed to read config file at {}", path.display()))?;
    let mut config: AppConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

    if let Ok(secret) = env::var(SECRET_KEY_ENV) {
        let secret = secret.trim().to_string();
        if !secret.is_empty() {
            config.auth.secret_key = secret;
        }
    }

    info!(path = %path.display(), "Configuration loaded from disk");
    Ok(config)
}

fn config_path() -> PathBuf {
    env::var("APP_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
}
