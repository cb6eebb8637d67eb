//! Configuration loader and validator for the book_media image reconciler.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub paths: Paths,
    pub wordpress: WordPress,
}

/// Input and output file locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Paths {
    /// JSON array of book_media rows joined to their WordPress post ids.
    pub media_map: String,
    /// Destination for the generated UPDATE statements.
    pub sql_out: String,
}

/// WordPress MySQL connection and URL settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordPress {
    pub host: String,
    pub user: String,
    pub password: String,
    pub database: String,
    /// Prefix joined with `_wp_attached_file` values to form full image URLs.
    pub base_url: String,
    /// Keys per IN-list query, bounds the query-string length.
    pub batch_size: usize,
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.paths.media_map.trim().is_empty() {
        return Err(ConfigError::Invalid("paths.media_map must be non-empty"));
    }
    if cfg.paths.sql_out.trim().is_empty() {
        return Err(ConfigError::Invalid("paths.sql_out must be non-empty"));
    }

    if cfg.wordpress.host.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.host must be non-empty"));
    }
    if cfg.wordpress.user.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.user must be non-empty"));
    }
    if cfg.wordpress.password.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.password must be non-empty"));
    }
    if cfg.wordpress.database.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.database must be non-empty"));
    }
    if cfg.wordpress.base_url.trim().is_empty() {
        return Err(ConfigError::Invalid("wordpress.base_url must be non-empty"));
    }
    if cfg.wordpress.batch_size == 0 {
        return Err(ConfigError::Invalid("wordpress.batch_size must be > 0"));
    }

    Ok(())
}

/// Example configuration with the operational defaults.
pub fn example() -> &'static str {
    r#"paths:
  media_map: "/tmp/book_media_map.json"
  sql_out: "/tmp/correct_image_updates.sql"

wordpress:
  host: "ageless-literature-wp-db.mysql.database.azure.com"
  user: "AgelessLiterature"
  password: "YOUR_WORDPRESS_DB_PASSWORD"
  database: "ageless_literature_prod_db"
  base_url: "https://www.agelessliterature.com/wp-content/uploads/"
  batch_size: 2000
"#
}
