//! Configuration module for registration-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub sms: SmsConfig,
    pub app_url: String,
    pub frontend_urls: Vec<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub jwt_secret: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Secret<String>,
    pub sender_id: String,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub api_requests: u32,
    pub api_window_seconds: u64,
    pub payment_requests: u32,
    pub payment_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            api_requests: 100,
            api_window_seconds: 900,
            payment_requests: 10,
            payment_window_seconds: 60,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn required_env(key: &str) -> Result<String, AppError> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::ConfigError(anyhow::anyhow!("{} is required", key)))
}

/// Split a comma separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl RegistrationConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let defaults = RateLimitConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "registration-service".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: required_env("DATABASE_URL")?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10),
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", 2),
            },
            auth: AuthConfig {
                jwt_secret: Secret::new(required_env("JWT_SECRET")?),
            },
            sms: SmsConfig {
                enabled: parse_env("SMS_ENABLED", false),
                api_url: env::var("SMS_API_URL").unwrap_or_default(),
                api_key: Secret::new(env::var("SMS_API_KEY").unwrap_or_default()),
                sender_id: env::var("SMS_SENDER_ID").unwrap_or_else(|_| "SCHOOL".to_string()),
            },
            app_url: env::var("APP_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            frontend_urls: parse_origins(
                &env::var("FRONTEND_URLS").unwrap_or_else(|_| "http://localhost:3000".to_string()),
            ),
            rate_limit: RateLimitConfig {
                api_requests: parse_env("RATE_LIMIT_API_REQUESTS", defaults.api_requests),
                api_window_seconds: parse_env(
                    "RATE_LIMIT_API_WINDOW_SECONDS",
                    defaults.api_window_seconds,
                ),
                payment_requests: parse_env(
                    "RATE_LIMIT_PAYMENT_REQUESTS",
                    defaults.payment_requests,
                ),
                payment_window_seconds: parse_env(
                    "RATE_LIMIT_PAYMENT_WINDOW_SECONDS",
                    defaults.payment_window_seconds,
                ),
            },
        })
    }
}
