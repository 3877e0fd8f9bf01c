use dotenv::dotenv;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::BookingError;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub api_base_url: String,
    pub session_signing_key: String,
    pub bind_addr: SocketAddr,
    pub request_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub session_idle_timeout: Duration,
}

// Positive whole seconds
fn parse_secs(name: &str, raw: Option<String>, default: u64) -> Result<Duration, BookingError> {
    let secs = match raw {
        Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
            BookingError::Validation(format!("{} must be a number of seconds", name))
        })?,
        None => default,
    };
    if secs == 0 {
        return Err(BookingError::Validation(format!(
            "{} must be greater than zero",
            name
        )));
    }
    Ok(Duration::from_secs(secs))
}

fn secs_from_env(name: &str, default: u64) -> Result<Duration, BookingError> {
    parse_secs(name, env::var(name).ok(), default)
}

impl PortalConfig {
    /// Read configuration from the environment (and `.env` if present).
    pub fn from_env() -> Result<Self, BookingError> {
        dotenv().ok();

        let api_base_url = env::var("PORTAL_API_BASE_URL").unwrap_or_else(|_| {
            warn!("PORTAL_API_BASE_URL not set, using {}", DEFAULT_API_BASE_URL);
            DEFAULT_API_BASE_URL.to_string()
        });

        let session_signing_key = env::var("SESSION_SIGNING_KEY").map_err(|_| {
            BookingError::Validation("SESSION_SIGNING_KEY must be set in environment".to_string())
        })?;
        if session_signing_key.len() < 16 {
            return Err(BookingError::Validation(
                "SESSION_SIGNING_KEY must be at least 16 characters".to_string(),
            ));
        }

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| BookingError::Validation(format!("BIND_ADDR is invalid: {}", e)))?;

        let config = Self {
            api_base_url,
            session_signing_key,
            bind_addr,
            request_timeout: secs_from_env("REQUEST_TIMEOUT_SECS", 10)?,
            heartbeat_interval: secs_from_env("HEARTBEAT_INTERVAL_SECS", 15)?,
            session_idle_timeout: secs_from_env("SESSION_IDLE_TIMEOUT_SECS", 1800)?,
        };

        info!(
            "Using backend {} (timeout {:?}, heartbeat every {:?})",
            config.api_base_url, config.request_timeout, config.heartbeat_interval
        );

        Ok(config)
    }
}
