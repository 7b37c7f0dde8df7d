//! Configuration management
//!
//! This module handles loading and parsing configuration for the Foodgram backend.
//! Configuration can be loaded from:
//! - config.yml file
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Media (recipe images) configuration
    #[serde(default)]
    pub media: MediaConfig,
    /// Recipe authoring limits and listing defaults
    #[serde(default)]
    pub recipes: RecipeConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database driver (sqlite or mysql)
    #[serde(default)]
    pub driver: DatabaseDriver,
    /// Database connection URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: DatabaseDriver::default(),
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/foodgram.db".to_string()
}

/// Database driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    /// SQLite (default)
    #[default]
    Sqlite,
    /// MySQL
    Mysql,
}

/// Media configuration
///
/// Recipe images arrive as base64 data URIs and are written below `root`.
/// Responses expose them under `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Directory decoded images are written to
    #[serde(default = "default_media_root")]
    pub root: PathBuf,
    /// Public URL prefix the media directory is served under
    #[serde(default = "default_media_url")]
    pub url: String,
    /// Maximum decoded image size in bytes (default: 5MB)
    #[serde(default = "default_max_image_size")]
    pub max_image_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: default_media_root(),
            url: default_media_url(),
            max_image_size: default_max_image_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_media_root() -> PathBuf {
    PathBuf::from("media")
}

fn default_media_url() -> String {
    "/media/".to_string()
}

fn default_max_image_size() -> u64 {
    5 * 1024 * 1024 // 5MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
    ]
}

impl MediaConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/bmp" => "bmp",
            _ => "bin",
        }
    }

    /// Build the public URL for a stored media path
    pub fn public_url(&self, path: &str) -> String {
        if path.is_empty() {
            return String::new();
        }
        format!("{}/{}", self.url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}

/// Recipe authoring limits and listing defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeConfig {
    /// Minimum cooking time in minutes
    #[serde(default = "default_cooking_time_min")]
    pub cooking_time_min: i64,
    /// Maximum cooking time in minutes
    #[serde(default = "default_cooking_time_max")]
    pub cooking_time_max: i64,
    /// Minimum ingredient amount
    #[serde(default = "default_amount_min")]
    pub amount_min: i64,
    /// Maximum ingredient amount
    #[serde(default = "default_amount_max")]
    pub amount_max: i64,
    /// Default page size for paginated lists
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for RecipeConfig {
    fn default() -> Self {
        Self {
            cooking_time_min: default_cooking_time_min(),
            cooking_time_max: default_cooking_time_max(),
            amount_min: default_amount_min(),
            amount_max: default_amount_max(),
            page_size: default_page_size(),
        }
    }
}

fn default_cooking_time_min() -> i64 {
    1
}

fn default_cooking_time_max() -> i64 {
    32_000
}

fn default_amount_min() -> i64 {
    1
}

fn default_amount_max() -> i64 {
    32_000
}

fn default_page_size() -> u32 {
    6
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - FOODGRAM_SERVER_HOST
    /// - FOODGRAM_SERVER_PORT
    /// - FOODGRAM_SERVER_CORS_ORIGIN
    /// - FOODGRAM_DATABASE_DRIVER
    /// - FOODGRAM_DATABASE_URL
    /// - FOODGRAM_MEDIA_ROOT
    /// - FOODGRAM_MEDIA_URL
    /// - FOODGRAM_RECIPES_PAGE_SIZE
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Check that configured bounds are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.recipes;
        if r.cooking_time_min < 1 || r.cooking_time_min > r.cooking_time_max {
            return Err(ConfigError::ValidationError(format!(
                "recipes.cooking_time bounds are invalid: [{}, {}]",
                r.cooking_time_min, r.cooking_time_max
            )));
        }
        if r.amount_min < 1 || r.amount_min > r.amount_max {
            return Err(ConfigError::ValidationError(format!(
                "recipes.amount bounds are invalid: [{}, {}]",
                r.amount_min, r.amount_max
            )));
        }
        if r.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "recipes.page_size must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        // Server configuration
        if let Ok(host) = std::env::var("FOODGRAM_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("FOODGRAM_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("FOODGRAM_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        // Database configuration
        if let Ok(driver) = std::env::var("FOODGRAM_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("FOODGRAM_DATABASE_URL") {
            self.database.url = url;
        }

        // Media configuration
        if let Ok(root) = std::env::var("FOODGRAM_MEDIA_ROOT") {
            self.media.root = PathBuf::from(root);
        }
        if let Ok(url) = std::env::var("FOODGRAM_MEDIA_URL") {
            self.media.url = url;
        }

        // Recipe listing
        if let Ok(page_size) = std::env::var("FOODGRAM_RECIPES_PAGE_SIZE") {
            if let Ok(page_size) = page_size.parse::<u32>() {
                if page_size > 0 {
                    self.recipes.page_size = page_size;
                }
            }
        }
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());
