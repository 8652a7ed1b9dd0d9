use crate::device::Token;
use config::{Config, ConfigError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    core: Core,
    spec: SpecSourceConfig,
    #[serde(default)]
    devices: Vec<DeviceConfig>,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(config::File::with_name("config").required(true))
            .add_source(config::File::with_name("config_local").required(false))
            .add_source(config::Environment::with_prefix("MIOT").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn core(&self) -> &Core {
        &self.core
    }

    pub fn spec(&self) -> &SpecSourceConfig {
        &self.spec
    }

    pub fn devices(&self) -> &[DeviceConfig] {
        &self.devices
    }
}

#[derive(Debug, Deserialize)]
pub struct Core {
    #[serde(with = "humantime_serde")]
    rpc_timeout: Duration,
    #[serde(with = "humantime_serde")]
    poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    snapshot_max_age: Duration,
}

impl Core {
    pub fn rpc_timeout(&self) -> Duration {
        self.rpc_timeout
    }

    /// Default poll interval for devices that do not declare one.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// How long a polled value counts as fresh for single property reads.
    pub fn snapshot_max_age(&self) -> Duration {
        self.snapshot_max_age
    }
}

#[derive(Debug, Deserialize)]
pub struct SpecSourceConfig {
    url: String,
    retry_ms: u64,
    retry_max_delay_ms: u64,
    retry_attempts: usize,
    #[serde(with = "humantime_serde")]
    request_timeout: Duration,
}

impl SpecSourceConfig {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn retry_ms(&self) -> u64 {
        self.retry_ms
    }

    pub fn retry_max_delay(&self) -> Duration {
        Duration::from_millis(self.retry_max_delay_ms)
    }

    pub fn retry_attempts(&self) -> usize {
        self.retry_attempts
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    name: String,
    host: String,
    token: Token,
    miot_type: String,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, with = "humantime_serde")]
    poll_interval: Option<Duration>,
}

impl DeviceConfig {
    pub fn new(name: impl Into<String>, host: impl Into<String>, token: impl Into<String>, miot_type: impl Into<String>) -> Self {
        DeviceConfig {
            name: name.into(),
            host: host.into(),
            token: Token::new(token),
            miot_type: miot_type.into(),
            model: None,
            poll_interval: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn miot_type(&self) -> &str {
        &self.miot_type
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or_default()
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }
}

#[cfg(test)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

#[cfg(test)]
impl AppConfigBuilder {
    pub fn new() -> Self {
        AppConfigBuilder {
            config: AppConfig {
                core: Core {
                    rpc_timeout: Duration::from_millis(200),
                    poll_interval: Duration::from_secs(30),
                    snapshot_max_age: Duration::from_secs(30),
                },
                spec: SpecSourceConfig {
                    url: "https://miot-spec.url".to_string(),
                    retry_ms: 10,
                    retry_max_delay_ms: 20,
                    retry_attempts: 2,
                    request_timeout: Duration::from_secs(5),
                },
                devices: Vec::new(),
            },
        }
    }

    pub fn spec_url(mut self, url: String) -> Self {
        self.config.spec.url = url;
        self
    }

    pub fn device(mut self, device: DeviceConfig) -> Self {
        self.config.devices.push(device);
        self
    }

    pub fn build(self) -> AppConfig {
        self.config
    }
}
