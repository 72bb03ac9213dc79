//! SMTP alert sink.
//!
//! Without a relay host, or without credentials, the sink runs in no-op
//! mode: alerts are written to the log and reported as delivered.

use crate::alert::{AlertError, AlertSink};
use crate::config::SmtpSettings;
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use rust_common::{PlatformError, RetryConfig, RetryPolicy};
use std::time::Duration;
use tracing::{info, warn};

/// Per-command deadline on the SMTP connection.
const SMTP_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

struct Relay {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

pub struct SmtpAlertSink {
    relay: Option<Relay>,
    retry: RetryPolicy,
}

impl SmtpAlertSink {
    /// Build the sink from configuration.
    pub fn new(settings: &SmtpSettings) -> Result<Self, AlertError> {
        if settings.host.trim().is_empty() {
            warn!("SMTP host not configured; alerts will be logged only");
            return Ok(Self::disabled());
        }
        let (Some(username), Some(password)) = (&settings.username, &settings.password) else {
            warn!("SMTP credentials not configured; alerts will be logged only");
            return Ok(Self::disabled());
        };

        let from = parse_mailbox("SMTP_FROM", &settings.from)?;
        let to = parse_mailbox("SMTP_TO", &settings.to)?;

        let builder = if settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)
        }
        .map_err(|e| AlertError::Configuration(format!("Failed to configure SMTP transport: {e}")))?;

        let transport = builder
            .port(settings.port)
            .timeout(Some(SMTP_COMMAND_TIMEOUT))
            .credentials(Credentials::new(
                username.to_string(),
                password.as_str().to_string(),
            ))
            .build();

        Ok(SmtpAlertSink {
            relay: Some(Relay {
                transport,
                from,
                to,
            }),
            retry: default_retry(),
        })
    }

    /// A sink that only logs.
    pub fn disabled() -> Self {
        SmtpAlertSink {
            relay: None,
            retry: default_retry(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.relay.is_some()
    }
}

#[async_trait]
impl AlertSink for SmtpAlertSink {
    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError> {
        let Some(relay) = &self.relay else {
            info!(subject, body, "Alert sink in no-op mode; alert logged only");
            return Ok(());
        };

        let message = Message::builder()
            .from(relay.from.clone())
            .to(relay.to.clone())
            .subject(subject)
            .header(header::ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| AlertError::Configuration(format!("Failed to build alert mail: {e}")))?;

        self.retry
            .execute("smtp_send", || {
                let message = message.clone();
                async move {
                    relay
                        .transport
                        .send(message)
                        .await
                        .map(|_| ())
                        .map_err(classify)
                }
            })
            .await
            .map_err(|e| AlertError::Delivery(e.to_string()))?;

        info!(subject, "Alert mail sent");
        Ok(())
    }
}

fn default_retry() -> RetryPolicy {
    RetryPolicy::new(
        RetryConfig::default()
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(500)),
    )
}

fn parse_mailbox(variable: &str, value: &str) -> Result<Mailbox, AlertError> {
    value
        .parse::<Mailbox>()
        .map_err(|e| AlertError::Configuration(format!("Invalid {variable} address: {e}")))
}

/// Permanent SMTP replies are not retried; everything else may be.
fn classify(err: lettre::transport::smtp::Error) -> PlatformError {
    if err.is_timeout() {
        PlatformError::Timeout(SMTP_COMMAND_TIMEOUT)
    } else if err.is_permanent() {
        PlatformError::rejected(err.to_string())
    } else {
        PlatformError::unavailable(err.to_string())
    }
}
