use anyhow::{Context, Result};
use config::{Config, Environment, File};
use moka::future::Cache;
use rand::RngCore;
use sea_orm::Database;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::auth::AuthManager;
use crate::schemas::{AppState, CachedData};

const DEFAULT_DATABASE_URL: &str = "sqlite://cashbook.db?mode=rwc";
const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Application settings, layered from defaults, `cashbook.toml` and
/// `CASHBOOK__*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    pub bind_address: String,
    pub auth: AuthSettings,
    pub logging: LogSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    /// HS256 signing secret. Left empty, an ephemeral one is generated.
    pub jwt_secret: String,
    pub token_ttl_minutes: i64,
    /// Failed logins tolerated per username or address inside the cool-off.
    pub failure_limit: i32,
    pub cooloff_minutes: i64,
    /// Reverse proxies in front of the server. Each appends one
    /// `X-Forwarded-For` hop; with zero the header is ignored.
    pub trusted_proxies: usize,
}

impl AuthSettings {
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.token_ttl_minutes)
    }

    pub fn cooloff(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cooloff_minutes)
    }

    /// Fills an empty secret with a random one. Returns whether it did.
    pub fn ensure_secret(&mut self) -> bool {
        if !self.jwt_secret.trim().is_empty() {
            return false;
        }
        warn!("CASHBOOK__AUTH__JWT_SECRET is not set, issued tokens will not survive a restart");
        self.jwt_secret = generate_secret(64);
        true
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    pub directory: PathBuf,
    /// Console filter used when `RUST_LOG` is not set.
    pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub max_capacity: u64,
    pub ttl_seconds: u64,
}

impl Settings {
    /// Loads `.env`, then merges the configuration sources.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let settings: Settings = Config::builder()
            .set_default("database_url", DEFAULT_DATABASE_URL)?
            .set_default("bind_address", DEFAULT_BIND_ADDRESS)?
            .set_default("auth.jwt_secret", "")?
            .set_default("auth.token_ttl_minutes", 1440_i64)?
            .set_default("auth.failure_limit", 5_i64)?
            .set_default("auth.cooloff_minutes", 60_i64)?
            .set_default("auth.trusted_proxies", 0_i64)?
            .set_default("logging.directory", "logs")?
            .set_default("logging.level", "info")?
            .set_default("cache.max_capacity", 1000_i64)?
            .set_default("cache.ttl_seconds", 300_i64)?
            .add_source(File::with_name("cashbook").required(false))
            .add_source(Environment::with_prefix("CASHBOOK").separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        Ok(settings)
    }
}

/// Random URL-safe secret of `length` characters.
pub fn generate_secret(length: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
    let mut bytes = vec![0u8; length];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
        .collect()
}

pub fn build_cache(settings: &CacheSettings) -> Cache<String, CachedData> {
    Cache::builder()
        .max_capacity(settings.max_capacity)
        .time_to_live(Duration::from_secs(settings.ttl_seconds))
        .build()
}

/// Initialize application state from the configured database
pub async fn initialize_app_state(settings: Settings) -> Result<AppState> {
    let database_url = settings.database_url.clone();
    initialize_app_state_with_url(settings, &database_url).await
}

/// Initialize application state against an explicit database url
pub async fn initialize_app_state_with_url(mut settings: Settings, database_url: &str) -> Result<AppState> {
    settings.auth.ensure_secret();
    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to {}", database_url))?;

    let cache = build_cache(&settings.cache);
    Ok(AppState {
        db,
        cache,
        auth: Arc::new(AuthManager::new(&settings.auth)),
        settings: Arc::new(settings),
    })
}
