//! InfluxDB HTTP sink
//!
//! Writes line protocol batches to the `/write` endpoint of an InfluxDB 1.x
//! compatible server.

use super::backend::{MetricsSink, PointBatch, SinkError};
use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

pub struct InfluxHttpClient {
    client: reqwest::Client,
    write_url: Url,
    username: String,
    password: String,
}

impl InfluxHttpClient {
    /// Validate the address and build the HTTP client
    pub fn connect(config: &HttpConfig) -> Result<Self, SinkError> {
        let base = Url::parse(&config.address)
            .map_err(|e| SinkError::InvalidAddress(format!("{}: {}", config.address, e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(SinkError::InvalidAddress(format!(
                "{}: scheme must be http or https",
                config.address
            )));
        }
        if base.host_str().is_none() {
            return Err(SinkError::InvalidAddress(format!(
                "{}: missing host",
                config.address
            )));
        }

        // Append to any path prefix, e.g. a reverse proxy mount
        let mut write_url = base;
        write_url
            .path_segments_mut()
            .map_err(|_| {
                SinkError::InvalidAddress(format!("{}: cannot be a base URL", config.address))
            })?
            .pop_if_empty()
            .push("write");

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        log::info!("🔌 InfluxDB client ready: {}", write_url);

        Ok(Self {
            client,
            write_url,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn write_url(&self) -> &Url {
        &self.write_url
    }
}

#[async_trait]
impl MetricsSink for InfluxHttpClient {
    async fn write(&self, batch: &PointBatch) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut request = self
            .client
            .post(self.write_url.clone())
            .query(&[("db", batch.database()), ("precision", batch.precision().as_str())])
            .body(batch.to_line_protocol());

        if !self.username.is_empty() {
            request = request.basic_auth(&self.username, Some(&self.password));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Status {
                status: status.as_u16(),
                body,
            });
        }

        log::debug!("✅ Wrote {} points to {}", batch.len(), batch.database());
        Ok(())
    }

    fn backend_type(&self) -> &'static str {
        "InfluxDB"
    }
}
