//! Configuration management for the SikaGreen platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with SIKA__ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Local file storage for uploads
    pub storage: StorageConfig,

    /// Statistics caching
    pub stats: StatsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory holding uploaded files
    pub root: String,

    /// Public origin used to build file URLs, e.g. https://api.sikagreen.tg
    pub public_base_url: String,

    /// Maximum size of an uploaded image
    pub image_max_bytes: usize,

    /// Maximum size of a chat attachment
    pub media_max_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StatsConfig {
    /// How long the global statistics stay cached
    pub cache_ttl_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("SIKA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 2_592_000)?
            .set_default("storage.root", "storage/public")?
            .set_default("storage.public_base_url", "http://localhost:8000")?
            .set_default("storage.image_max_bytes", 2 * 1024 * 1024)?
            .set_default("storage.media_max_bytes", 10 * 1024 * 1024)?
            .set_default("stats.cache_ttl_secs", 300)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (SIKA_ prefix)
            .add_source(
                Environment::with_prefix("SIKA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Largest request body the server accepts
    pub fn max_body_bytes(&self) -> usize {
        // Multipart framing adds a little on top of the file itself
        self.storage.media_max_bytes.max(self.storage.image_max_bytes) + 64 * 1024
    }
}
