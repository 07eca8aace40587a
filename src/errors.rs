// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error types for pdnsync.
//!
//! This module provides specialized error types for:
//! - Reconciliation failures (no zone, no name, missing servers)
//! - PowerDNS HTTP API failures
//! - Zone and API server configuration validation
//!
//! Every variant carries enough context to be logged into a job record as-is.

use thiserror::Error;

/// Errors returned by the PowerDNS wire client.
#[derive(Error, Debug, Clone)]
pub enum PdnsError {
    /// The API answered with a non-success status code
    #[error("PowerDNS API {method} {url} returned HTTP {status}: {body}")]
    Http {
        /// HTTP method of the failed request
        method: String,
        /// Full request URL
        url: String,
        /// HTTP status code
        status: u16,
        /// Response body, if any
        body: String,
    },

    /// The request never produced a response (DNS, refused connection, timeout)
    #[error("HTTP connection to {url} failed: {reason}")]
    Connection {
        /// Full request URL
        url: String,
        /// Reason reported by the HTTP client
        reason: String,
    },

    /// The response body could not be decoded
    #[error("Malformed response from {url}: {reason}")]
    Decode {
        /// Full request URL
        url: String,
        /// Decoder error
        reason: String,
    },

    /// `/servers` returned an empty list
    #[error("PowerDNS API at {url} lists no servers")]
    NoServerId {
        /// API base URL
        url: String,
    },

    /// A URL could not be built from the API base URL
    #[error("Invalid PowerDNS API URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser error
        reason: String,
    },
}

/// Errors raised while reconciling addresses and zones.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No naming strategy of the zone produced a name for the address
    #[error("No forward name for IP:{address} (zone:{})", zone.as_deref().unwrap_or("-"))]
    NoNameFound {
        /// The address (with prefix length) being named
        address: String,
        /// Zone whose naming methods were tried, if one was found
        zone: Option<String>,
    },

    /// No zone matched an address that needs a forward record
    #[error("No forward zone found for IP:{address}")]
    NoZoneFound {
        /// The address (with prefix length)
        address: String,
    },

    /// A bound API server does not have the zone provisioned
    #[error("Zone {zone} not found on server {server}")]
    ServerZoneMissing {
        /// Zone name
        zone: String,
        /// API server name
        server: String,
    },

    /// The zone has no enabled API servers
    #[error("No valid servers found for zone {zone}")]
    NoServers {
        /// Zone name
        zone: String,
    },

    /// The TTL custom field of an address holds something other than a positive integer
    #[error("Custom field {field} must be a positive integer (got {value})")]
    InvalidTtl {
        /// Custom field name
        field: String,
        /// Rendered offending value
        value: String,
    },

    /// The wire client failed
    #[error(transparent)]
    Backend(#[from] PdnsError),

    /// The inventory store failed
    #[error("Inventory query failed: {0}")]
    Inventory(String),

    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SyncError {
    /// Returns true if this error is transient and rescheduling the task may help.
    ///
    /// Configuration problems (missing zone, missing name, bad TTL) are permanent
    /// until an operator changes something.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Backend(PdnsError::Http { status, .. }) => *status == 429 || *status >= 500,
            Self::Backend(PdnsError::Connection { .. }) | Self::Inventory(_) | Self::Other(_) => {
                true
            }
            Self::Backend(
                PdnsError::Decode { .. } | PdnsError::NoServerId { .. } | PdnsError::InvalidUrl { .. },
            )
            | Self::NoNameFound { .. }
            | Self::NoZoneFound { .. }
            | Self::ServerZoneMissing { .. }
            | Self::NoServers { .. }
            | Self::InvalidTtl { .. } => false,
        }
    }

    /// Returns a stable reason code, used as a metrics label and in job logs.
    #[must_use]
    pub fn status_reason(&self) -> &'static str {
        match self {
            Self::NoNameFound { .. } => "NoNameFound",
            Self::NoZoneFound { .. } => "NoZoneFound",
            Self::ServerZoneMissing { .. } => "ServerZoneMissing",
            Self::NoServers { .. } => "NoServers",
            Self::InvalidTtl { .. } => "InvalidTtl",
            Self::Backend(PdnsError::Http { .. }) => "PowerDnsHttpError",
            Self::Backend(PdnsError::Connection { .. }) => "PowerDnsUnreachable",
            Self::Backend(PdnsError::Decode { .. }) => "PowerDnsMalformedResponse",
            Self::Backend(PdnsError::NoServerId { .. }) => "PowerDnsNoServerId",
            Self::Backend(PdnsError::InvalidUrl { .. }) => "PowerDnsInvalidUrl",
            Self::Inventory(_) => "InventoryError",
            Self::Other(_) => "SyncFailed",
        }
    }
}

/// Messages of every error underneath `err`, outermost first.
#[must_use]
pub fn error_sources(err: &(dyn std::error::Error + 'static)) -> Vec<String> {
    let mut sources = Vec::new();
    let mut next = err.source();
    while let Some(cause) = next {
        sources.push(cause.to_string());
        next = cause.source();
    }
    sources
}

/// Zone and API server configuration violations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Zone name is too short, not dot-terminated, or has invalid characters
    #[error("Invalid zone name '{zone}': {reason}")]
    InvalidZoneName {
        /// Zone name
        zone: String,
        /// What is wrong with it
        reason: String,
    },

    /// A reverse zone carries a matcher or naming field
    #[error("Reverse zone {zone} cannot set {field}")]
    ReverseZoneField {
        /// Zone name
        zone: String,
        /// Offending field
        field: &'static str,
    },

    /// A reverse zone is marked default
    #[error("Reverse zone {zone} cannot be set as default")]
    ReverseZoneDefault {
        /// Zone name
        zone: String,
    },

    /// A forward zone has no naming method
    #[error("Zone {zone}: at least one of naming methods must be set")]
    NoNamingMethod {
        /// Zone name
        zone: String,
    },

    /// A second default zone was added
    #[error("Only one zone can be set as default ({existing} already is, cannot add {zone})")]
    DuplicateDefault {
        /// Zone being added
        zone: String,
        /// Current default zone
        existing: String,
    },

    /// Zone name already registered
    #[error("Zone {zone} already exists")]
    DuplicateZone {
        /// Zone name
        zone: String,
    },

    /// Zone references an API server that does not exist
    #[error("Zone {zone} references unknown API server {server}")]
    UnknownServer {
        /// Zone name
        zone: String,
        /// Server name
        server: String,
    },

    /// API server name already registered
    #[error("API server name {name} already exists")]
    DuplicateServerName {
        /// Server name
        name: String,
    },

    /// API server URL already registered
    #[error("API server URL {url} already used by {existing}")]
    DuplicateServerUrl {
        /// Server URL
        url: String,
        /// Server already using it
        existing: String,
    },

    /// API server URL does not parse or is not http(s)
    #[error("API server {name} has invalid URL '{url}': {reason}")]
    InvalidServerUrl {
        /// Server name
        name: String,
        /// Server URL
        url: String,
        /// Parser error
        reason: String,
    },

    /// A required field is empty
    #[error("{entity} {name}: {field} must not be empty")]
    EmptyField {
        /// Entity kind (`Zone`, `ApiServer`)
        entity: &'static str,
        /// Entity name
        name: String,
        /// Field name
        field: &'static str,
    },
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
