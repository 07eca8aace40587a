// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Configuration file loading.
//!
//! pdnsync reads a single YAML document with camelCase keys:
//!
//! ```yaml
//! settings:
//!   ttlCustomField: dns_ttl
//!   managedRecordComment: pdnsync
//!   autoTrigger: true
//! apiServers:
//!   - name: pdns1
//!     apiUrl: http://pdns1:8081/api/v1
//!     apiToken: secret
//! zones:
//!   - name: corp.example.com.
//!     apiServers: [pdns1]
//!     naming:
//!       ip: dnsName
//!   - name: 10.in-addr.arpa.
//!     apiServers: [pdns1]
//! schedules:
//!   - zone: corp.example.com.
//!     intervalMinutes: 60
//! inventory:
//!   path: inventory.yaml
//! workers: 4
//! jobRetention:
//!   maxFinished: 1000
//!   maxAgeMinutes: 1440
//! ```
//!
//! [`Config::build_registry`] turns the zone and server lists into a validated
//! [`ZoneRegistry`].

use crate::canonical::canonicalize;
use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_JOB_RETENTION_COUNT, DEFAULT_JOB_RETENTION_MINUTES,
    DEFAULT_MANAGED_RECORD_COMMENT, DEFAULT_WORKERS, METRICS_SERVER_BIND_ADDRESS,
    METRICS_SERVER_PORT,
};
use crate::model::{ApiServer, Zone};
use crate::registry::ZoneRegistry;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn default_managed_comment() -> Option<String> {
    Some(DEFAULT_MANAGED_RECORD_COMMENT.to_string())
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_bind_address() -> String {
    METRICS_SERVER_BIND_ADDRESS.to_string()
}

fn default_metrics_port() -> u16 {
    METRICS_SERVER_PORT
}

fn default_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

fn default_retention_count() -> usize {
    DEFAULT_JOB_RETENTION_COUNT
}

fn default_retention_minutes() -> u32 {
    DEFAULT_JOB_RETENTION_MINUTES
}

/// Engine settings passed to every task.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Address custom field holding a per-address TTL override
    #[serde(default)]
    pub ttl_custom_field: Option<String>,

    /// Comment written to created rrsets; when set, only rrsets carrying it
    /// are considered managed. Empty or null disables the filter.
    #[serde(default = "default_managed_comment")]
    pub managed_record_comment: Option<String>,

    /// Enqueue address updates from inventory change notifications
    #[serde(default)]
    pub auto_trigger: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ttl_custom_field: None,
            managed_record_comment: default_managed_comment(),
            auto_trigger: false,
        }
    }
}

impl Settings {
    /// Managed comment token, `None` when the filter is disabled.
    #[must_use]
    pub fn managed_comment(&self) -> Option<&str> {
        self.managed_record_comment
            .as_deref()
            .filter(|c| !c.is_empty())
    }

    /// TTL custom field name, `None` when unset or empty.
    #[must_use]
    pub fn ttl_field(&self) -> Option<&str> {
        self.ttl_custom_field.as_deref().filter(|f| !f.is_empty())
    }
}

/// A recurring or one-shot full sync of one zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSchedule {
    /// Zone name
    pub zone: String,

    /// Repeat interval; runs once when unset
    #[serde(default)]
    pub interval_minutes: Option<u32>,

    /// First run; immediately when unset
    #[serde(default)]
    pub start_at: Option<DateTime<Utc>>,
}

/// Where the inventory snapshot lives.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryConfig {
    /// YAML snapshot path, relative paths resolve against the config file
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Metrics HTTP server settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    /// Listen address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Listen port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_metrics_port(),
        }
    }
}

/// PowerDNS HTTP client settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpConfig {
    /// Retry 429 and 5xx responses with exponential backoff
    #[serde(default)]
    pub retry: bool,

    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            retry: false,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl HttpConfig {
    /// Per-request timeout as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// How long the runner keeps finished jobs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRetention {
    /// Finished jobs kept; the oldest go first
    #[serde(default = "default_retention_count")]
    pub max_finished: usize,

    /// Minutes after completion a finished job is dropped
    #[serde(default = "default_retention_minutes")]
    pub max_age_minutes: u32,
}

impl Default for JobRetention {
    fn default() -> Self {
        Self {
            max_finished: default_retention_count(),
            max_age_minutes: default_retention_minutes(),
        }
    }
}

impl JobRetention {
    /// Maximum age of a finished job.
    #[must_use]
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.max_age_minutes))
    }
}

/// Top-level configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Engine settings
    #[serde(default)]
    pub settings: Settings,

    /// PowerDNS API servers
    #[serde(default)]
    pub api_servers: Vec<ApiServer>,

    /// Managed zones
    #[serde(default)]
    pub zones: Vec<Zone>,

    /// Full syncs started by `serve`
    #[serde(default)]
    pub schedules: Vec<SyncSchedule>,

    /// Inventory snapshot
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// Maximum number of concurrently running jobs
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Finished job retention
    #[serde(default)]
    pub job_retention: JobRetention,

    /// Metrics server
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// PowerDNS client
    #[serde(default)]
    pub http: HttpConfig,

    /// Directory of the file this was loaded from
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::from_yaml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the document does not deserialize.
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        if config.workers == 0 {
            bail!("workers must be at least 1");
        }
        Ok(config)
    }

    /// Inventory snapshot path, resolved against the config file directory.
    #[must_use]
    pub fn inventory_path(&self) -> Option<PathBuf> {
        let path = self.inventory.path.as_ref()?;
        match &self.base_dir {
            Some(dir) if path.is_relative() => Some(dir.join(path)),
            _ => Some(path.clone()),
        }
    }

    /// Validate servers, zones and schedules into a registry.
    ///
    /// Servers are added first so zones can reference them.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure, naming the offending entry.
    pub fn build_registry(&self) -> Result<ZoneRegistry> {
        let mut registry = ZoneRegistry::new();
        for server in &self.api_servers {
            registry
                .add_server(server.clone())
                .with_context(|| format!("Invalid API server {}", server.name))?;
        }
        for zone in &self.zones {
            registry
                .add_zone(zone.clone())
                .with_context(|| format!("Invalid zone {}", zone.name))?;
        }
        for schedule in &self.schedules {
            if registry.zone(&canonicalize(&schedule.zone)).is_none() {
                bail!("Schedule references unknown zone {}", schedule.zone);
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
