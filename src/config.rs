//! Runtime configuration for agents and the purchase client.

use crate::domain::delivery::DEFAULT_QUEUE_CAPACITY;
use crate::error::{AgentError, Result};
use clap::{Args, ValueEnum};

/// Connection parameters for the message broker.
#[derive(Debug, Clone, Args)]
pub struct BrokerConfig {
    /// Broker address, e.g. mqtt://localhost:1883
    #[arg(long = "broker-url", env = "STOREFRONT_BROKER_URL", default_value = "mqtt://localhost:1883")]
    pub url: String,

    /// Message VPN. Used as a topic namespace prefix when set.
    #[arg(long, env = "STOREFRONT_VPN")]
    pub vpn: Option<String>,

    #[arg(long, env = "STOREFRONT_USERNAME")]
    pub username: Option<String>,

    #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Client name presented to the broker. Must be unique per connection.
    #[arg(long, env = "STOREFRONT_CLIENT_NAME", default_value = "storefront-agent")]
    pub client_name: String,

    #[arg(long, default_value_t = 30)]
    pub keep_alive_secs: u64,

    /// Seconds to wait for the broker to accept the connection.
    #[arg(long, default_value_t = 10)]
    pub connect_timeout_secs: u64,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            url: "mqtt://localhost:1883".into(),
            vpn: None,
            username: None,
            password: None,
            client_name: "storefront-agent".into(),
            keep_alive_secs: 30,
            connect_timeout_secs: 10,
        }
    }
}

impl BrokerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("mqtt://") || self.url.starts_with("mqtts://")) {
            return Err(AgentError::Config(format!(
                "broker url must start with mqtt:// or mqtts://, got '{}'",
                self.url
            )));
        }
        if self.client_name.trim().is_empty() {
            return Err(AgentError::Config("client_name must not be empty".into()));
        }
        if self.username.is_none() && self.password.is_some() {
            return Err(AgentError::Config("password given without a username".into()));
        }
        Ok(())
    }

    pub fn use_tls(&self) -> bool {
        self.url.starts_with("mqtts://")
    }

    /// Host part of the broker url.
    pub fn host(&self) -> String {
        match authority(&self.url).split(':').next() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => "localhost".to_string(),
        }
    }

    /// Port part of the broker url, defaulting to 1883 (8883 for mqtts).
    pub fn port(&self) -> u16 {
        let default_port = if self.use_tls() { 8883 } else { 1883 };
        authority(&self.url)
            .split_once(':')
            .and_then(|(_, port)| port.parse().ok())
            .unwrap_or(default_port)
    }
}

/// `host[:port]` of the url, without scheme or path.
fn authority(url: &str) -> &str {
    let rest = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("mqtts://"))
        .unwrap_or(url);
    rest.split('/').next().unwrap_or_default()
}

/// How notifications about a purchase are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum NotificationFormat {
    /// The notification text alone.
    #[default]
    Text,
    /// The purchase echoed back as JSON with `message` set to the notification text.
    Json,
}

/// Tuning for a single agent runtime.
#[derive(Debug, Clone, Args)]
pub struct AgentOptions {
    /// Number of deliveries buffered before the broker is made to wait.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    #[arg(long, value_enum, default_value_t = NotificationFormat::Text)]
    pub notification_format: NotificationFormat,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            notification_format: NotificationFormat::Text,
        }
    }
}
