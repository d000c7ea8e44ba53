//! HTTP delivery to the ingestion endpoint.

use super::{Transport, TransportAck, TransportError};
use crate::dsn::Dsn;
use crate::envelope::Envelope;
use crate::{REPORTER_NAME, VERSION};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

const ENVELOPE_CONTENT_TYPE: &str = "application/x-sentry-envelope";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Posts each envelope synchronously; nothing is buffered, so `flush` has
/// nothing to wait for.
pub struct HttpTransport {
    endpoint: String,
    auth_header: String,
    http_client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(dsn: &Dsn) -> Result<Self, TransportError> {
        let http_client = reqwest::Client::builder()
            .user_agent(format!("{}/{}", REPORTER_NAME, VERSION))
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            endpoint: dsn.envelope_url(),
            auth_header: dsn.auth_header(),
            http_client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, envelope: &Envelope) -> Result<TransportAck, TransportError> {
        let body = envelope.to_wire()?;
        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-Sentry-Auth", &self.auth_header)
            .header(reqwest::header::CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(endpoint = %self.endpoint, status = status.as_u16(), "envelope delivered");
        Ok(TransportAck {
            status: Some(status.as_u16()),
        })
    }

    async fn flush(&self, _timeout: Duration) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_from_dsn() {
        let dsn = Dsn::parse("https://key@errors.example.com/12").expect("dsn");
        let transport = HttpTransport::new(&dsn).expect("transport");
        assert_eq!(transport.endpoint(), "https://errors.example.com/api/12/envelope/");
        assert_eq!(transport.name(), "http");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_an_error() {
        let dsn = Dsn::parse("http://key@127.0.0.1:9/1").expect("dsn");
        let transport = HttpTransport::new(&dsn).expect("transport");
        let event = crate::event::Event::from_error(&crate::event::CapturedError {
            name: "Error".into(),
            message: "m".into(),
            stack: None,
        });
        let envelope = Envelope::from_event(&event, Some(dsn.as_str())).expect("envelope");

        assert!(transport.send(&envelope).await.is_err());
    }
}
