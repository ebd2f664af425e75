//! PurpleAir JSON client.

use async_trait::async_trait;
use tracing::debug;

use airalert_core::{SensorSource, SourceError};
use airalert_types::SensorReading;

use crate::config::SourceConfig;

/// Fetches readings from the PurpleAir JSON endpoint.
///
/// One request per sensor: `GET {base_url}?show={sensor_id}`.
#[derive(Debug, Clone)]
pub struct PurpleAirSource {
    client: reqwest::Client,
    base_url: String,
}

impl PurpleAirSource {
    /// Build a client with the configured timeout.
    pub fn new(config: &SourceConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!("airalert/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl SensorSource for PurpleAirSource {
    async fn fetch(&self, sensor_id: &str) -> Result<SensorReading, SourceError> {
        let request_failed = |e: reqwest::Error| SourceError::Request {
            sensor: sensor_id.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("show", sensor_id)])
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                sensor: sensor_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(request_failed)?;
        let reading =
            SensorReading::from_slice(sensor_id, &body).map_err(|e| SourceError::Decode {
                sensor: sensor_id.to_string(),
                source: e,
            })?;

        debug!(
            "Sensor {} ({}): PM2.5 {} (valid: {})",
            sensor_id, reading.label, reading.pm25, reading.valid
        );
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and return the request line received.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/json", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            request.lines().next().unwrap_or_default().to_string()
        });

        (url, handle)
    }

    fn source_for(url: String) -> PurpleAirSource {
        PurpleAirSource::new(&SourceConfig {
            base_url: url,
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_parses_reading() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"results":[{"Label":"Roof","temp_f":"71","LastSeen":1600000000,"PM2_5Value":"35.5"}]}"#,
        )
        .await;

        let reading = source_for(url).fetch("61605").await.unwrap();
        assert_eq!(reading.sensor_id, "61605");
        assert_eq!(reading.label, "Roof");
        assert_eq!(reading.pm25, 35.5);
        assert_eq!(reading.last_seen, 1_600_000_000);
        assert!(reading.valid);

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with("GET /json?show=61605 "), "{request_line}");
    }

    #[tokio::test]
    async fn test_fetch_partial_payload_is_invalid_reading() {
        let (url, _server) = serve_once("200 OK", r#"{"results":[]}"#).await;
        let reading = source_for(url).fetch("1").await.unwrap();
        assert!(!reading.valid);
        assert_eq!(reading.pm25, 0.0);
    }

    #[tokio::test]
    async fn test_fetch_http_error_status() {
        let (url, _server) = serve_once("503 Service Unavailable", "{}").await;
        let err = source_for(url).fetch("61605").await.unwrap_err();
        assert!(matches!(err, SourceError::Status { status: 503, .. }));
        assert_eq!(err.sensor(), "61605");
    }

    #[tokio::test]
    async fn test_fetch_undecodable_body() {
        let (url, _server) = serve_once("200 OK", "<html>").await;
        let err = source_for(url).fetch("61605").await.unwrap_err();
        assert!(matches!(err, SourceError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}/json", listener.local_addr().unwrap());
        drop(listener);

        let err = source_for(url).fetch("61605").await.unwrap_err();
        assert!(matches!(err, SourceError::Request { .. }));
    }
}
