//! Tracing subscriber setup shared by all services.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Tracing configuration.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Service name, attached to the start-up event
    pub service_name: String,
    /// Filter directive used when `RUST_LOG` is not set
    pub log_level: String,
    /// Whether to output JSON format
    pub json_output: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            service_name: "rust-service".to_string(),
            log_level: "info".to_string(),
            json_output: false,
        }
    }
}

impl TracingConfig {
    /// Defaults for a deployment environment: readable debug output while
    /// developing, JSON at info level everywhere else.
    #[must_use]
    pub fn for_environment(environment: &str) -> Self {
        if environment.eq_ignore_ascii_case("development") {
            Self {
                log_level: "debug".to_string(),
                ..Self::default()
            }
        } else {
            Self::default().with_json_output()
        }
    }

    /// Create config with custom service name.
    #[must_use]
    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    /// Create config with custom log level.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Enable JSON output.
    #[must_use]
    pub const fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

/// Install the global tracing subscriber.
///
/// Returns `false` when a global subscriber was already installed (tests
/// calling this more than once), `true` otherwise.
pub fn init_tracing(config: &TracingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let installed = if config.json_output {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::info!(service = %config.service_name, level = %config.log_level, "Tracing initialized");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TracingConfig::default();
        assert_eq!(config.service_name, "rust-service");
        assert_eq!(config.log_level, "info");
        assert!(!config.json_output);
    }

    #[test]
    fn test_environment_defaults() {
        let dev = TracingConfig::for_environment("development");
        assert_eq!(dev.log_level, "debug");
        assert!(!dev.json_output);

        let prod = TracingConfig::for_environment("production");
        assert_eq!(prod.log_level, "info");
        assert!(prod.json_output);
    }

    #[test]
    fn test_second_init_is_reported() {
        let config = TracingConfig::default().with_service_name("tracing-test");
        let _ = init_tracing(&config);
        assert!(!init_tracing(&config));
    }
}
