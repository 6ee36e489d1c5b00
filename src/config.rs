/// Configuration management for the Lumen sync server
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use std::env;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub store: StoreConfig,
    pub auth: AuthPolicy,
    pub email: Option<EmailConfig>,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Public base URL used when building magic links
    pub public_url: String,
    /// Echo the magic link in API responses (local testing only)
    pub dev_mode: bool,
}

/// Account store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub redis_url: String,
    /// Prefix for every key written to the store
    pub key_prefix: String,
}

/// Session and token lifetime policy
///
/// Every window lives here as a named field rather than a literal scattered
/// through the handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthPolicy {
    /// Magic-link token lifetime in seconds
    pub magic_link_ttl_secs: u64,
    /// Absolute session window in days
    pub session_window_days: i64,
    /// Sliding-renewal trigger: validations inside this many days of expiry
    /// extend the session by a fresh window
    pub renewal_window_days: i64,
    /// Single-session guard lookback in days
    pub conflict_lookback_days: i64,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            magic_link_ttl_secs: 900,
            session_window_days: 30,
            renewal_window_days: 7,
            conflict_lookback_days: 30,
        }
    }
}

/// Email configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub smtp_url: String,
    pub from_address: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ApiResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("LUMEN_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("LUMEN_PORT")
            .unwrap_or_else(|_| "8600".to_string())
            .parse()
            .map_err(|_| ApiError::Validation("Invalid port number".to_string()))?;
        let public_url = env::var("LUMEN_PUBLIC_URL")
            .unwrap_or_else(|_| format!("http://{}:{}", hostname, port));
        let dev_mode = env::var("LUMEN_DEV_MODE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let redis_url =
            env::var("LUMEN_REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        let key_prefix = env::var("LUMEN_KEY_PREFIX").unwrap_or_else(|_| "lumen:".to_string());

        let magic_link_ttl_secs = env::var("LUMEN_MAGIC_LINK_TTL_SECS")
            .unwrap_or_else(|_| "900".to_string())
            .parse()
            .unwrap_or(900);
        let session_window_days = env::var("LUMEN_SESSION_WINDOW_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);
        let renewal_window_days = env::var("LUMEN_RENEWAL_WINDOW_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse()
            .unwrap_or(7);
        let conflict_lookback_days = env::var("LUMEN_CONFLICT_LOOKBACK_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .unwrap_or(30);

        let email = if let Ok(smtp_url) = env::var("LUMEN_EMAIL_SMTP_URL") {
            Some(EmailConfig {
                smtp_url,
                from_address: env::var("LUMEN_EMAIL_FROM_ADDRESS")
                    .unwrap_or_else(|_| format!("noreply@{}", hostname)),
            })
        } else {
            None
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
                dev_mode,
            },
            store: StoreConfig {
                redis_url,
                key_prefix,
            },
            auth: AuthPolicy {
                magic_link_ttl_secs,
                session_window_days,
                renewal_window_days,
                conflict_lookback_days,
            },
            email,
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ApiError::Validation("Hostname cannot be empty".to_string()));
        }
        if self.auth.magic_link_ttl_secs == 0 {
            return Err(ApiError::Validation(
                "Magic link TTL must be positive".to_string(),
            ));
        }
        if self.auth.renewal_window_days >= self.auth.session_window_days {
            return Err(ApiError::Validation(
                "Renewal window must be shorter than the session window".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServerConfig {
    /// Configuration with stock policy windows, for tests and dev runs
    pub fn for_tests() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: 0,
                public_url: "http://localhost:8600".to_string(),
                dev_mode: true,
            },
            store: StoreConfig {
                redis_url: "redis://localhost:6379".to_string(),
                key_prefix: "lumen:".to_string(),
            },
            auth: AuthPolicy::default(),
            email: None,
            logging: LoggingConfig {
                level: "debug".to_string(),
            },
        }
    }
}
