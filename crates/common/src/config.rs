//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Shopping list export configuration.
    #[serde(default)]
    pub export: ExportConfig,
    /// List pagination configuration.
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Output format of a downloaded shopping list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// PDF document.
    #[default]
    Pdf,
    /// UTF-8 plain text.
    #[serde(alias = "text")]
    Txt,
}

/// Shopping list export configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    /// Format used when the request does not ask for one.
    #[serde(default)]
    pub default_format: DocumentFormat,
    /// Font size of the document title, in points.
    #[serde(default = "default_title_font_size")]
    pub title_font_size: f32,
    /// Font size of the ingredient lines, in points.
    #[serde(default = "default_item_font_size")]
    pub item_font_size: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: DocumentFormat::default(),
            title_font_size: default_title_font_size(),
            item_font_size: default_item_font_size(),
        }
    }
}

impl ExportConfig {
    /// Check that both font sizes are finite and positive.
    pub fn validate(&self) -> Result<(), String> {
        for (key, size) in [
            ("title_font_size", self.title_font_size),
            ("item_font_size", self.item_font_size),
        ] {
            if !size.is_finite() || size <= 0.0 {
                return Err(format!("export.{key} must be a positive number, got {size}"));
            }
        }
        Ok(())
    }
}

/// Pagination configuration for list endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Page size when the request gives no `limit`.
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,
    /// Upper bound for a requested `limit`.
    #[serde(default = "default_max_page_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_page_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_connections() -> u32 {
    20
}

const fn default_min_connections() -> u32 {
    2
}

const fn default_title_font_size() -> f32 {
    24.0
}

const fn default_item_font_size() -> f32 {
    14.0
}

const fn default_page_limit() -> u64 {
    6
}

const fn default_max_page_limit() -> u64 {
    100
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FOODGRAM_ENV`)
    /// 3. Environment variables with `FOODGRAM_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FOODGRAM_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FOODGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FOODGRAM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize::<Self>()?.validated()
    }

    fn validated(self) -> Result<Self, config::ConfigError> {
        self.export.validate().map_err(config::ConfigError::Message)?;
        Ok(self)
    }
}
