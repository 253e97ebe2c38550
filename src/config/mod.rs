//! Configuration module for the station amenity backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

/// Accepted session lifetimes, one hour up to a year.
const SESSION_TTL_HOURS: std::ops::RangeInclusive<i64> = 1..=8760;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Directory uploaded images are written to and served from
    pub upload_dir: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Lifetime of a login session
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`; turn off for plain-HTTP development
    pub cookie_secure: bool,
    /// Bootstrap SuperAdmin, created on startup when both are set
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    /// Outbound mail; alerts are skipped when absent
    pub smtp: Option<SmtpConfig>,
    pub ai: AiConfig,
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

/// Chat-completion provider used for photo analysis.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: "./data/amenities.sqlite".into(),
            upload_dir: "./data/uploads".into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            session_ttl_hours: 24,
            cookie_secure: true,
            admin_email: None,
            admin_password: None,
            smtp: None,
            ai: AiConfig::default(),
        }
    }
}

/// A variable was set but could not be parsed.
#[derive(Debug)]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid value for {}: {:?}", self.var, self.value)
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();

        let db_path = env::var("AMENITY_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let upload_dir = env::var("AMENITY_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.upload_dir);

        let bind_addr = parse_var("AMENITY_BIND_ADDR")?.unwrap_or(defaults.bind_addr);

        let log_level = env::var("AMENITY_LOG_LEVEL").unwrap_or(defaults.log_level);

        let session_ttl_hours =
            parse_var("AMENITY_SESSION_TTL_HOURS")?.unwrap_or(defaults.session_ttl_hours);
        if !SESSION_TTL_HOURS.contains(&session_ttl_hours) {
            return Err(ConfigError {
                var: "AMENITY_SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
            });
        }

        let cookie_secure = parse_var("AMENITY_COOKIE_SECURE")?.unwrap_or(defaults.cookie_secure);

        let smtp = match non_empty("AMENITY_SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_var("AMENITY_SMTP_PORT")?.unwrap_or(587),
                username: non_empty("AMENITY_SMTP_USERNAME"),
                password: non_empty("AMENITY_SMTP_PASSWORD"),
                from: env::var("AMENITY_MAIL_FROM")
                    .unwrap_or_else(|_| "noreply@localhost".to_string()),
            }),
            None => None,
        };

        let ai = AiConfig {
            api_key: non_empty("AMENITY_AI_API_KEY"),
            api_url: env::var("AMENITY_AI_API_URL").unwrap_or(defaults.ai.api_url),
            model: env::var("AMENITY_AI_MODEL").unwrap_or(defaults.ai.model),
            timeout_secs: parse_var("AMENITY_AI_TIMEOUT_SECS")?.unwrap_or(defaults.ai.timeout_secs),
        };

        Ok(Self {
            db_path,
            upload_dir,
            bind_addr,
            log_level,
            session_ttl_hours,
            cookie_secure,
            admin_email: non_empty("AMENITY_ADMIN_EMAIL"),
            admin_password: non_empty("AMENITY_ADMIN_PASSWORD"),
            smtp,
            ai,
        })
    }
}

fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match non_empty(var) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| ConfigError { var, value }),
        None => Ok(None),
    }
}
