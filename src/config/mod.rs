//! Configuration management
//!
//! This module handles loading and parsing configuration for ClinicLane.
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
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Upload configuration
    #[serde(default)]
    pub upload: UploadConfig,
    /// Public site configuration
    #[serde(default)]
    pub site: SiteConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
    /// Template override configuration
    #[serde(default)]
    pub theme: ThemeConfig,
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
    /// CORS allowed origin (for cookie-based auth)
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
    8080
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
    "data/cliniclane.db".to_string()
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

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached entries
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_max_capacity() -> u64 {
    10_000
}

/// Upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Upload directory path
    #[serde(default = "default_upload_path")]
    pub path: PathBuf,
    /// Public URL prefix the upload directory is served under
    #[serde(default = "default_url_prefix")]
    pub url_prefix: String,
    /// Maximum file size in bytes (default: 10MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Allowed image MIME types
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: default_upload_path(),
            url_prefix: default_url_prefix(),
            max_file_size: default_max_file_size(),
            allowed_types: default_allowed_types(),
        }
    }
}

fn default_upload_path() -> PathBuf {
    PathBuf::from("uploads")
}

fn default_url_prefix() -> String {
    "/uploads".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024 // 10MB
}

fn default_allowed_types() -> Vec<String> {
    vec![
        "image/jpeg".to_string(),
        "image/png".to_string(),
        "image/gif".to_string(),
        "image/webp".to_string(),
        "image/svg+xml".to_string(),
    ]
}

impl UploadConfig {
    /// Check if a MIME type is allowed
    pub fn is_type_allowed(&self, mime_type: &str) -> bool {
        self.allowed_types.iter().any(|t| t == mime_type)
    }

    /// Get file extension for a MIME type
    pub fn get_extension(&self, mime_type: &str) -> &'static str {
        match mime_type {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/gif" => "gif",
            "image/webp" => "webp",
            "image/svg+xml" => "svg",
            _ => "bin",
        }
    }

    /// Public URL for a stored file name
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), file_name)
    }

    /// Map a public URL back to the stored file name, if it points into the upload directory
    pub fn local_file_name<'a>(&self, url: &'a str) -> Option<&'a str> {
        let prefix = format!("{}/", self.url_prefix.trim_end_matches('/'));
        url.strip_prefix(prefix.as_str())
            .filter(|name| !name.is_empty() && !name.contains('/') && !name.contains(".."))
    }
}

/// Public site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Site name used in titles and Open Graph tags
    #[serde(default = "default_site_name")]
    pub name: String,
    /// Absolute base URL used for canonical links, exports and the sitemap
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Fallback language code
    #[serde(default = "default_language")]
    pub default_language: String,
    /// Languages seeded on startup as `(code, display name)`
    #[serde(default = "default_locales")]
    pub locales: Vec<LocaleConfig>,
    /// Articles per page on the public home page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

/// A seeded locale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocaleConfig {
    pub code: String,
    pub name: String,
}

impl LocaleConfig {
    fn new(code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
        }
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: default_site_name(),
            base_url: default_base_url(),
            default_language: default_language(),
            locales: default_locales(),
            page_size: default_page_size(),
        }
    }
}

impl SiteConfig {
    /// Absolute URL for a site path
    pub fn absolute_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

fn default_site_name() -> String {
    "ClinicLane".to_string()
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_language() -> String {
    "english".to_string()
}

fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig::new("english", "English"),
        LocaleConfig::new("german", "Deutsch"),
        LocaleConfig::new("french", "Français"),
        LocaleConfig::new("urdu", "اردو"),
    ]
}

fn default_page_size() -> u32 {
    10
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Template override configuration
///
/// Templates are embedded in the binary. When `path` is set, any `.html`
/// file found there replaces the embedded template of the same name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub path: Option<PathBuf>,
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
    /// - CLINICLANE_SERVER_HOST
    /// - CLINICLANE_SERVER_PORT
    /// - CLINICLANE_SERVER_CORS_ORIGIN
    /// - CLINICLANE_DATABASE_DRIVER
    /// - CLINICLANE_DATABASE_URL
    /// - CLINICLANE_CACHE_TTL_SECONDS
    /// - CLINICLANE_UPLOAD_PATH
    /// - CLINICLANE_SITE_NAME
    /// - CLINICLANE_SITE_BASE_URL
    /// - CLINICLANE_SITE_DEFAULT_LANGUAGE
    /// - CLINICLANE_AUTH_SESSION_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("CLINICLANE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("CLINICLANE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(cors_origin) = std::env::var("CLINICLANE_SERVER_CORS_ORIGIN") {
            self.server.cors_origin = cors_origin;
        }

        if let Ok(driver) = std::env::var("CLINICLANE_DATABASE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "sqlite" => self.database.driver = DatabaseDriver::Sqlite,
                "mysql" => self.database.driver = DatabaseDriver::Mysql,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(url) = std::env::var("CLINICLANE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(ttl) = std::env::var("CLINICLANE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }

        if let Ok(path) = std::env::var("CLINICLANE_UPLOAD_PATH") {
            self.upload.path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var("CLINICLANE_SITE_NAME") {
            self.site.name = name;
        }
        if let Ok(base_url) = std::env::var("CLINICLANE_SITE_BASE_URL") {
            self.site.base_url = base_url;
        }
        if let Ok(language) = std::env::var("CLINICLANE_SITE_DEFAULT_LANGUAGE") {
            if !language.trim().is_empty() {
                self.site.default_language = language.trim().to_lowercase();
            }
        }

        if let Ok(days) = std::env::var("CLINICLANE_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                if days > 0 {
                    self.auth.session_days = days;
                }
            }
        }
    }

    /// Reject values that parse but cannot work
    fn validate(&self) -> Result<(), ConfigError> {
        if self.site.default_language.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "site.default_language cannot be empty".to_string(),
            ));
        }
        if self.auth.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be positive".to_string(),
            ));
        }
        if self.site.page_size == 0 {
            return Err(ConfigError::ValidationError(
                "site.page_size must be positive".to_string(),
            ));
        }
        Ok(())
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

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
const ENV_KEYS: &[&str] = &[
    "CLINICLANE_SERVER_HOST",
    "CLINICLANE_SERVER_PORT",
    "CLINICLANE_SERVER_CORS_ORIGIN",
    "CLINICLANE_DATABASE_DRIVER",
    "CLINICLANE_DATABASE_URL",
    "CLINICLANE_CACHE_TTL_SECONDS",
    "CLINICLANE_UPLOAD_PATH",
    "CLINICLANE_SITE_NAME",
    "CLINICLANE_SITE_BASE_URL",
    "CLINICLANE_SITE_DEFAULT_LANGUAGE",
    "CLINICLANE_AUTH_SESSION_DAYS",
];

#[cfg(test)]
fn clear_env() {
    for key in ENV_KEYS {
        std::env::remove_var(key);
    }
}


/// Property-based tests for configuration parsing
#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        super::CONFIG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn valid_host_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u8..=255, 0u8..=255, 0u8..=255, 0u8..=255)
                .prop_map(|(a, b, c, d)| format!("{}.{}.{}.{}", a, b, c, d)),
            Just("localhost".to_string()),
            "[a-z][a-z0-9]{0,10}".prop_map(|s| s),
        ]
    }

    fn valid_language_strategy() -> impl Strategy<Value = String> {
        "[a-z]{2,12}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Serializing a config and loading it back preserves the fields we care about
        #[test]
        fn config_roundtrip(
            host in valid_host_strategy(),
            port in 1u16..=65535,
            ttl in 1u64..=86_400,
            language in valid_language_strategy(),
            session_days in 1i64..=365,
        ) {
            let mut config = Config::default();
            config.server.host = host.clone();
            config.server.port = port;
            config.cache.ttl_seconds = ttl;
            config.site.default_language = language.clone();
            config.auth.session_days = session_days;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = NamedTempFile::new().unwrap();
            write!(file, "{}", yaml).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(loaded.server.host, host);
            prop_assert_eq!(loaded.server.port, port);
            prop_assert_eq!(loaded.cache.ttl_seconds, ttl);
            prop_assert_eq!(loaded.site.default_language, language);
            prop_assert_eq!(loaded.auth.session_days, session_days);
        }

        /// Environment values always win over file values
        #[test]
        fn env_precedence_over_file(file_port in 1u16..=65535, env_port in 1u16..=65535) {
            let _guard = lock_env();
            clear_env();

            let mut file = NamedTempFile::new().unwrap();
            write!(file, "server:\n  port: {}\n", file_port).unwrap();
            std::env::set_var("CLINICLANE_SERVER_PORT", env_port.to_string());

            let config = Config::load_with_env(file.path()).unwrap();
            clear_env();

            prop_assert_eq!(config.server.port, env_port);
        }
    }
}
