use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Settings for the planner-photo extraction service.
/// Extraction is disabled when `api_key` is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".into(),
            model: "gemini-1.5-flash-001".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub extraction: ExtractionConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "dayplan".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "dayplan-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };

        let defaults = ExtractionConfig::default();
        let extraction = ExtractionConfig {
            api_key: std::env::var("EXTRACTION_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            base_url: std::env::var("EXTRACTION_BASE_URL").unwrap_or(defaults.base_url),
            model: std::env::var("EXTRACTION_MODEL").unwrap_or(defaults.model),
            timeout_secs: env_parse("EXTRACTION_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
        };

        Ok(Self {
            database_url,
            jwt,
            extraction,
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
