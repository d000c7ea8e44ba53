//! Declarative reporter configuration (`failcast.toml`).
//!
//! Holds the data-only subset of [`ReporterOptions`]; hooks and custom
//! transports can only be set programmatically.

use crate::error::Result;
use crate::options::ReporterOptions;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// File name looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "failcast.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReporterConfig {
    pub dsn: Option<String>,
    pub enabled: Option<bool>,
    pub environment: Option<String>,
    pub release: Option<String>,
    pub server_name: Option<String>,
    pub dist: Option<String>,
    pub dry_run: Option<bool>,
    pub max_events_per_run: Option<u64>,
    pub framework_version: Option<String>,
    pub tags: BTreeMap<String, Value>,
}

impl ReporterConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), "loaded reporter config");
        Ok(config)
    }

    /// Overlay `other` onto `self`: every field `other` sets wins, tag maps
    /// are merged key by key.
    pub fn merge(mut self, other: ReporterConfig) -> Self {
        fn overlay<T>(base: &mut Option<T>, top: Option<T>) {
            if top.is_some() {
                *base = top;
            }
        }

        overlay(&mut self.dsn, other.dsn);
        overlay(&mut self.enabled, other.enabled);
        overlay(&mut self.environment, other.environment);
        overlay(&mut self.release, other.release);
        overlay(&mut self.server_name, other.server_name);
        overlay(&mut self.dist, other.dist);
        overlay(&mut self.dry_run, other.dry_run);
        overlay(&mut self.max_events_per_run, other.max_events_per_run);
        overlay(&mut self.framework_version, other.framework_version);
        self.tags.extend(other.tags);
        self
    }

    pub fn into_options(self) -> ReporterOptions {
        ReporterOptions {
            dsn: self.dsn,
            enabled: self.enabled,
            environment: self.environment,
            release: self.release,
            server_name: self.server_name,
            dist: self.dist,
            tags: self.tags.into_iter().collect(),
            max_events_per_run: self.max_events_per_run,
            dry_run: self.dry_run.unwrap_or(false),
            framework_version: self.framework_version,
            ..ReporterOptions::default()
        }
    }
}
