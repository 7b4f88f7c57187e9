//! Configuration types
//!
//! Server configuration read from the environment (and `.env`, loaded by the binary).

use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::{info, warn};

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-5.1";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen port, bound on all interfaces
    pub port: u16,
    /// Directory holding the catalog and technical tables
    pub data_dir: PathBuf,
    /// User database file
    pub users_file: PathBuf,
    /// Static assets served for unmatched routes
    pub public_dir: PathBuf,
    /// Shared secret for `/admin/*`; empty rejects every admin call
    pub admin_key: String,
    pub openai_api_key: String,
    pub api_base_url: String,
    /// Model used to sort irrigation from non-irrigation questions
    pub classifier_model: String,
    /// Model that writes the answers
    pub chat_model: String,
    /// Optional TrueType font for PDF export (needed for full Turkish glyphs)
    pub pdf_font: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            data_dir: PathBuf::from("data"),
            users_file: PathBuf::from("users.json"),
            public_dir: PathBuf::from("public"),
            admin_key: String::new(),
            openai_api_key: String::new(),
            api_base_url: DEFAULT_API_BASE.to_string(),
            classifier_model: DEFAULT_CLASSIFIER_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            pdf_font: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: try_load("PORT", defaults.port),
            data_dir: load_or("SULAMA_DATA_DIR", defaults.data_dir),
            users_file: load_or("SULAMA_USERS_FILE", defaults.users_file),
            public_dir: load_or("SULAMA_PUBLIC_DIR", defaults.public_dir),
            admin_key: env::var("ADMIN_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
            api_base_url: load_or("OPENAI_BASE_URL", defaults.api_base_url),
            classifier_model: load_or("SULAMA_CLASSIFIER_MODEL", defaults.classifier_model),
            chat_model: load_or("SULAMA_CHAT_MODEL", defaults.chat_model),
            pdf_font: env::var("SULAMA_PDF_FONT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
        }
    }
}

fn load_or<T: From<String>>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => T::from(value),
        _ => default,
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => parse_or(key, &raw, default),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_or<T>(key: &str, raw: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    raw.trim().parse().unwrap_or_else(|e| {
        warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
        default
    })
}
