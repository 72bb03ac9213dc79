//! Centralized configuration for the token rotation service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup. Parsing goes through a lookup function so it can be
//! exercised without touching the process environment.

use crate::error::ConfigError;
use crate::refresh::RotationSettings;
use rand::RngCore;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroizing;

const MIN_SECRET_LEN: usize = 32;
const GENERATED_SECRET_LEN: usize = 64;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::invalid("ENV", format!("unknown environment {other:?}"))),
        }
    }
}

/// Which session store backs the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Redis { url: String },
}

/// Alert mail relay settings.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Relay host; empty disables delivery
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub from: String,
    pub to: String,
    /// STARTTLS on a plain port rather than implicit TLS
    pub starttls: bool,
}

/// Token rotation service configuration.
#[derive(Clone)]
pub struct Config {
    pub environment: Environment,

    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    pub log_level: String,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,

    // Token settings
    /// HS512 shared secret
    pub jwt_secret: Zeroizing<Vec<u8>>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,

    // Collaborators
    pub store: StoreBackend,
    pub store_timeout: Duration,
    pub alert_timeout: Duration,
    pub smtp: SmtpSettings,
}

impl Config {
    /// Load configuration from `.env` and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let environment = match var("ENV") {
            Some(value) => value.parse()?,
            None => Environment::Development,
        };

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_var(&var, "PORT", 8080u16)?;
        let log_level = var("LOG_LEVEL").unwrap_or_else(|| match environment {
            Environment::Development => "debug".to_string(),
            _ => "info".to_string(),
        });
        let trust_forwarded_for = parse_bool(&var, "TRUST_FORWARDED_FOR", false)?;

        let jwt_secret = match var("JWT_SECRET_KEY") {
            Some(secret) if secret.len() < MIN_SECRET_LEN => {
                return Err(ConfigError::invalid(
                    "JWT_SECRET_KEY",
                    format!("must be at least {MIN_SECRET_LEN} bytes"),
                ));
            }
            Some(secret) => Zeroizing::new(secret.into_bytes()),
            None if environment == Environment::Production => {
                return Err(ConfigError::Missing("JWT_SECRET_KEY"));
            }
            // Development and test get a throwaway key per process
            None => {
                let mut key = vec![0u8; GENERATED_SECRET_LEN];
                rand::thread_rng().fill_bytes(&mut key);
                Zeroizing::new(key)
            }
        };

        let access_token_ttl = Duration::from_secs(parse_var(&var, "ACCESS_TOKEN_TTL", 900u64)?);
        let refresh_token_ttl =
            Duration::from_secs(parse_var(&var, "REFRESH_TOKEN_TTL", 86_400u64)?);
        if access_token_ttl.is_zero() {
            return Err(ConfigError::invalid("ACCESS_TOKEN_TTL", "must be at least 1 second"));
        }
        if refresh_token_ttl <= access_token_ttl {
            return Err(ConfigError::invalid(
                "REFRESH_TOKEN_TTL",
                "must be longer than ACCESS_TOKEN_TTL",
            ));
        }

        let store = match var("SESSION_STORE")
            .unwrap_or_else(|| "memory".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "redis" => StoreBackend::Redis {
                url: var("REDIS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            },
            other => {
                return Err(ConfigError::invalid(
                    "SESSION_STORE",
                    format!("expected memory or redis, got {other:?}"),
                ))
            }
        };
        let store_timeout = Duration::from_millis(parse_var(&var, "STORE_TIMEOUT_MS", 2000u64)?);
        let alert_timeout = Duration::from_secs(parse_var(&var, "ALERT_TIMEOUT_SECS", 10u64)?);

        let from = var("SMTP_FROM").unwrap_or_else(|| "security@localhost".to_string());
        let smtp = SmtpSettings {
            host: var("SMTP_HOST").unwrap_or_default(),
            port: parse_var(&var, "SMTP_PORT", 587u16)?,
            username: var("SMTP_USERNAME"),
            password: var("SMTP_PASSWORD").map(Zeroizing::new),
            to: var("SMTP_TO").unwrap_or_else(|| from.clone()),
            from,
            starttls: parse_bool(&var, "SMTP_STARTTLS", true)?,
        };

        Ok(Self {
            environment,
            host,
            port,
            log_level,
            trust_forwarded_for,
            jwt_secret,
            access_token_ttl,
            refresh_token_ttl,
            store,
            store_timeout,
            alert_timeout,
            smtp,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn rotation_settings(&self) -> RotationSettings {
        RotationSettings {
            access_ttl: self.access_token_ttl,
            refresh_ttl: self.refresh_token_ttl,
            store_timeout: self.store_timeout,
            alert_timeout: self.alert_timeout,
        }
    }
}

/// Parse a variable with a default value.
fn parse_var<T, F>(var: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match var(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::invalid(name, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool<F>(var: &F, name: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(name).map(|v| v.trim().to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::invalid(name, format!("expected a boolean, got {v:?}"))),
        },
    }
}
