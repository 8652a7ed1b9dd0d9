use crate::app_config::SpecSourceConfig;
use crate::spec::SpecError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt::Debug;
use std::time::Duration;
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, info, instrument, warn};

/// Resolves a device type URN into its raw capability description.
#[async_trait]
pub trait SpecSource: Debug + Send + Sync {
    async fn fetch(&self, miot_type: &str) -> Result<serde_json::Value, SpecError>;
}

#[derive(Debug)]
pub struct HttpSpecSource {
    client: Client,
    url: String,
    retry_ms: u64,
    retry_max_delay: Duration,
    retry_attempts: usize,
}

impl HttpSpecSource {
    pub fn new(config: &SpecSourceConfig) -> Result<Self, SpecError> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(HttpSpecSource {
            client,
            url: config.url().trim_end_matches('/').to_string(),
            retry_ms: config.retry_ms(),
            retry_max_delay: config.retry_max_delay(),
            retry_attempts: config.retry_attempts(),
        })
    }

    async fn fetch_once(&self, miot_type: &str) -> Result<serde_json::Value, SpecError> {
        let response = self
            .client
            .get(format!("{}/miot-spec-v2/instance", self.url))
            .query(&[("type", miot_type)])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SpecError::NotFound {
                miot_type: miot_type.to_string(),
            });
        }

        let body = response.error_for_status()?.json::<serde_json::Value>().await?;

        // Unknown types are answered with a 200 and an error document
        if body.get("services").is_none() && (body.get("error").is_some() || body.get("status").is_some()) {
            debug!(body = %body, "Spec service rejected type '{}'", miot_type);
            return Err(SpecError::NotFound {
                miot_type: miot_type.to_string(),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl SpecSource for HttpSpecSource {
    #[instrument(skip(self))]
    async fn fetch(&self, miot_type: &str) -> Result<serde_json::Value, SpecError> {
        info!("📥 Fetching capability description...");

        let strategy = ExponentialBackoff::from_millis(2)
            .factor((self.retry_ms / 2).max(1))
            .max_delay(self.retry_max_delay)
            .map(jitter)
            .take(self.retry_attempts);

        let result = RetryIf::spawn(
            strategy,
            || async {
                self.fetch_once(miot_type).await.inspect_err(|e| {
                    if matches!(e, SpecError::Request(_)) {
                        warn!("⚠️ Fetching capability description failed: {}. Retrying...", e);
                    }
                })
            },
            |e: &SpecError| matches!(e, SpecError::Request(_)),
        )
        .await;

        match &result {
            Ok(_) => info!("📥 Fetching capability description... OK"),
            Err(e) => warn!("📥 Fetching capability description... failed, {}", e),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use crate::spec::DeviceSpec;
    use mockito::Matcher;

    const LIGHT_TYPE: &str = "urn:miot-spec-v2:device:light:0000A001:yeelink-color1:1";

    fn source(url: String) -> HttpSpecSource {
        let config = AppConfigBuilder::new().spec_url(url).build();
        HttpSpecSource::new(config.spec()).expect("valid source")
    }

    #[tokio::test]
    async fn fetch_returns_the_capability_description() -> Result<(), SpecError> {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/miot-spec-v2/instance")
            .match_query(Matcher::UrlEncoded("type".to_string(), LIGHT_TYPE.to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/yeelink_light_spec.json"))
            .create_async()
            .await;

        let body = source(server.url()).fetch(LIGHT_TYPE).await?;
        let spec = DeviceSpec::from_value(body)?;

        mock.assert();
        assert_eq!(spec.r#type(), LIGHT_TYPE);
        Ok(())
    }

    #[tokio::test]
    async fn fetch_maps_not_found_to_spec_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/miot-spec-v2/instance")
            .match_query(Matcher::Any)
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let result = source(server.url()).fetch("urn:unknown").await;

        mock.assert();
        assert!(matches!(result, Err(SpecError::NotFound { miot_type }) if miot_type == "urn:unknown"));
    }

    #[tokio::test]
    async fn fetch_maps_an_error_document_to_spec_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/miot-spec-v2/instance")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"status": "error", "error": "invalid type"}"#)
            .create_async()
            .await;

        let result = source(server.url()).fetch("urn:unknown").await;

        assert!(matches!(result, Err(SpecError::NotFound { .. })));
    }

    #[tokio::test]
    async fn fetch_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/miot-spec-v2/instance")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(3)
            .create_async()
            .await;

        let result = source(server.url()).fetch(LIGHT_TYPE).await;

        mock.assert();
        assert!(matches!(result, Err(SpecError::Request(_))));
    }
}
