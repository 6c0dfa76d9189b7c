use std::env;

use tracing::info;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Dedup ledger
    pub database_url: String,

    // AI provider
    pub gemini_api_key: String,
    pub gemini_model: String,

    // Image providers (optional: absence means "provider unavailable")
    pub unsplash_access_key: Option<String>,
    pub pexels_api_key: Option<String>,

    // Publishing
    pub linkedin_access_token: String,
    pub linkedin_person_urn: String,

    // Tunables
    /// Items older than this many hours are dropped by the freshness filter.
    pub recency_hours: i64,
    /// Model provider requests-per-minute ceiling used to pace batch calls.
    pub model_rpm: u32,
    /// How many images to attach to a post.
    pub image_count: usize,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing.
    pub fn from_env() -> Self {
        Self {
            database_url: required_env("DATABASE_URL"),
            gemini_api_key: required_env("GEMINI_API_KEY"),
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-pro".to_string()),
            unsplash_access_key: optional_env("UNSPLASH_ACCESS_KEY"),
            pexels_api_key: optional_env("PEXELS_API_KEY"),
            linkedin_access_token: required_env("LINKEDIN_ACCESS_TOKEN"),
            linkedin_person_urn: required_env("LINKEDIN_PERSON_URN"),
            recency_hours: env::var("RECENCY_HOURS")
                .unwrap_or_else(|_| "72".to_string())
                .parse()
                .expect("RECENCY_HOURS must be a number"),
            model_rpm: env::var("MODEL_RPM")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("MODEL_RPM must be a number"),
            image_count: env::var("IMAGE_COUNT")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .expect("IMAGE_COUNT must be a number"),
        }
    }

    /// Log the non-secret parts of the configuration.
    pub fn log_redacted(&self) {
        info!(
            model = self.gemini_model.as_str(),
            recency_hours = self.recency_hours,
            model_rpm = self.model_rpm,
            image_count = self.image_count,
            unsplash_configured = self.unsplash_access_key.is_some(),
            pexels_configured = self.pexels_api_key.is_some(),
            "Configuration loaded"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}
