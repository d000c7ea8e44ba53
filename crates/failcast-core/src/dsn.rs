//! Endpoint credentials (`scheme://public_key@host[:port][/prefix]/project_id`).

use crate::error::{FailcastError, Result};
use crate::{REPORTER_NAME, VERSION};
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

/// Parsed endpoint credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    raw: String,
    scheme: String,
    public_key: String,
    host: String,
    port: Option<u16>,
    path_prefix: String,
    project_id: String,
}

impl Dsn {
    pub fn parse(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).map_err(|e| FailcastError::InvalidDsn(e.to_string()))?;

        let scheme = url.scheme().to_string();
        if scheme != "http" && scheme != "https" {
            return Err(FailcastError::InvalidDsn(format!(
                "unsupported scheme: {}",
                scheme
            )));
        }

        let public_key = url.username().to_string();
        if public_key.is_empty() {
            return Err(FailcastError::InvalidDsn("missing public key".to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| FailcastError::InvalidDsn("missing host".to_string()))?
            .to_string();

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();
        let project_id = segments
            .pop()
            .ok_or_else(|| FailcastError::InvalidDsn("missing project id".to_string()))?
            .to_string();
        let path_prefix = segments.iter().map(|seg| format!("/{}", seg)).collect();

        Ok(Self {
            raw: raw.to_string(),
            scheme,
            public_key,
            host,
            port: url.port(),
            path_prefix,
            project_id,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Ingestion URL for envelopes.
    pub fn envelope_url(&self) -> String {
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();
        format!(
            "{}://{}{}{}/api/{}/envelope/",
            self.scheme, self.host, port, self.path_prefix, self.project_id
        )
    }

    /// Value of the authentication header sent with every envelope.
    pub fn auth_header(&self) -> String {
        format!(
            "Sentry sentry_version=7, sentry_client={}/{}, sentry_key={}",
            REPORTER_NAME, VERSION, self.public_key
        )
    }
}

impl FromStr for Dsn {
    type Err = FailcastError;

    fn from_str(s: &str) -> Result<Self> {
        Dsn::parse(s)
    }
}

impl fmt::Display for Dsn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
