// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone and API server entities.
//!
//! These are the two configuration records pdnsync works from. Both are plain
//! serde structs loaded from the configuration file; [`Zone::validate`] and
//! [`ApiServer::validate`] enforce the per-entity invariants and the
//! [`ZoneRegistry`](crate::registry::ZoneRegistry) enforces the cross-entity ones
//! (unique names, unique default zone).
//!
//! # Example
//!
//! ```yaml
//! name: corp.example.com.
//! defaultTtl: 600
//! apiServers: [pdns1]
//! matchers:
//!   addressTags: [dns]
//!   deviceRoles: [access]
//! naming:
//!   ip: dnsName
//!   device: byInterfaceExceptPrimary
//! ```

use crate::canonical::{is_reverse_zone, is_within_zone, reverse_dns_name};
use crate::constants::{DEFAULT_ZONE_TTL_SECS, MIN_ZONE_NAME_LEN};
use crate::errors::ValidationError;
use crate::inventory::IpAddress;
use crate::naming::NamingMethods;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::LazyLock;

/// Dot-terminated labels of up to 63 letters, digits and hyphens.
static ZONE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z0-9][a-zA-Z0-9\-]{0,62}\.)*$").expect("static regex is valid")
});

fn default_true() -> bool {
    true
}

fn default_ttl() -> u32 {
    DEFAULT_ZONE_TTL_SECS
}

/// Criteria a zone uses to claim addresses that are not named into it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneMatchers {
    /// Address tags
    #[serde(default)]
    pub address_tags: BTreeSet<String>,
    /// Interface tags (device and VM interfaces)
    #[serde(default)]
    pub interface_tags: BTreeSet<String>,
    /// Device and virtual machine tags
    #[serde(default)]
    pub device_tags: BTreeSet<String>,
    /// Failover group tags
    #[serde(default)]
    pub failover_group_tags: BTreeSet<String>,
    /// Device or virtual machine roles
    #[serde(default)]
    pub device_roles: BTreeSet<String>,
    /// Restrict the zone to addresses on management-only interfaces
    #[serde(default)]
    pub mgmt_only: bool,
}

impl ZoneMatchers {
    /// Names of the fields that are set, in declaration order.
    fn set_fields(&self) -> impl Iterator<Item = &'static str> {
        [
            (!self.address_tags.is_empty()).then_some("matchers.addressTags"),
            (!self.interface_tags.is_empty()).then_some("matchers.interfaceTags"),
            (!self.device_tags.is_empty()).then_some("matchers.deviceTags"),
            (!self.failover_group_tags.is_empty()).then_some("matchers.failoverGroupTags"),
            (!self.device_roles.is_empty()).then_some("matchers.deviceRoles"),
            self.mgmt_only.then_some("matchers.mgmtOnly"),
        ]
        .into_iter()
        .flatten()
    }

    /// Returns true if any tag or role criterion selects `address`.
    #[must_use]
    pub fn matches_any(&self, address: &IpAddress) -> bool {
        let host = address.host();
        intersects(&self.address_tags, &address.tags)
            || address
                .interface()
                .is_some_and(|i| intersects(&self.interface_tags, &i.tags))
            || host.is_some_and(|h| intersects(&self.device_tags, &h.tags))
            || address
                .failover_group()
                .is_some_and(|g| intersects(&self.failover_group_tags, &g.tags))
            || host
                .and_then(|h| h.role_name())
                .is_some_and(|role| self.device_roles.contains(role))
    }
}

/// Returns true if the two tag sets share at least one tag.
pub(crate) fn intersects(wanted: &BTreeSet<String>, actual: &BTreeSet<String>) -> bool {
    !wanted.is_empty() && !wanted.is_disjoint(actual)
}

/// A DNS zone pdnsync manages records in.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    /// Fully qualified zone name, dot-terminated
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Disabled zones are ignored by matching and skipped by sync
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fallback zone for addresses nothing else matches
    #[serde(default)]
    pub is_default: bool,

    /// TTL used when an address carries no override
    #[serde(default = "default_ttl")]
    pub default_ttl: u32,

    /// Names of the API servers hosting this zone
    #[serde(default)]
    pub api_servers: Vec<String>,

    /// Tag and role matchers
    #[serde(default)]
    pub matchers: ZoneMatchers,

    /// Naming methods
    #[serde(default)]
    pub naming: NamingMethods,
}

impl Zone {
    /// Create an enabled zone with default TTL and no matchers or naming methods.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            enabled: true,
            is_default: false,
            default_ttl: DEFAULT_ZONE_TTL_SECS,
            api_servers: Vec::new(),
            matchers: ZoneMatchers::default(),
            naming: NamingMethods::default(),
        }
    }

    /// Returns true if this is an `in-addr.arpa.` or `ip6.arpa.` zone.
    #[must_use]
    pub fn is_reverse(&self) -> bool {
        is_reverse_zone(&self.name)
    }

    /// Check the zone on its own.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule: malformed name, reverse zone with
    /// matcher or naming fields or the default flag, forward zone without any
    /// naming method.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidZoneName {
            zone: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField {
                entity: "Zone",
                name: String::new(),
                field: "name",
            });
        }
        if self.name.len() < MIN_ZONE_NAME_LEN {
            return Err(invalid("must be at least 3 characters long"));
        }
        if !self.name.ends_with('.') {
            return Err(invalid("must end with a dot"));
        }
        if !ZONE_NAME_RE.is_match(&self.name) {
            return Err(invalid(
                "labels must be 1 to 63 letters, digits or hyphens and must not start with a hyphen",
            ));
        }

        if self.is_reverse() {
            if self.is_default {
                return Err(ValidationError::ReverseZoneDefault {
                    zone: self.name.clone(),
                });
            }
            if let Some(field) = self.matchers.set_fields().next() {
                return Err(ValidationError::ReverseZoneField {
                    zone: self.name.clone(),
                    field,
                });
            }
            let naming_field = [
                self.naming.ip.map(|_| "naming.ip"),
                self.naming.device.map(|_| "naming.device"),
                self.naming.failover_group.map(|_| "naming.failoverGroup"),
            ]
            .into_iter()
            .flatten()
            .next();
            if let Some(field) = naming_field {
                return Err(ValidationError::ReverseZoneField {
                    zone: self.name.clone(),
                    field,
                });
            }
        } else if self.naming.is_empty() {
            return Err(ValidationError::NoNamingMethod {
                zone: self.name.clone(),
            });
        }
        Ok(())
    }

    /// Returns true if a full sync of this zone considers `address`.
    ///
    /// An address is a candidate when its DNS name, its host's name or its
    /// failover group's name lies in the zone, when any matcher selects it, or,
    /// for a reverse zone, when its reverse lookup name lies in the zone. A
    /// management-only zone additionally requires a management-only interface.
    #[must_use]
    pub fn selects_address(&self, address: &IpAddress) -> bool {
        let named_into = |name: &str| !name.is_empty() && is_within_zone(name, &self.name);
        let selected = named_into(&address.dns_name)
            || address.host().is_some_and(|h| named_into(&h.name))
            || address.failover_group().is_some_and(|g| named_into(&g.name))
            || self.matchers.matches_any(address)
            || (self.is_reverse() && is_within_zone(&reverse_dns_name(address.ip()), &self.name));
        selected && (!self.matchers.mgmt_only || address.on_mgmt_interface())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A PowerDNS HTTP API endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiServer {
    /// Unique name zones refer to
    pub name: String,

    /// Free-form description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Disabled servers receive no reads or writes
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API base URL, e.g. `http://pdns:8081/api/v1`
    pub api_url: String,

    /// Value of the `X-API-Key` header
    pub api_token: String,

    /// PowerDNS server id; discovered from `/servers` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_id: Option<String>,
}

impl ApiServer {
    /// Create an enabled server.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        api_url: impl Into<String>,
        api_token: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            enabled: true,
            api_url: api_url.into(),
            api_token: api_token.into(),
            server_id: None,
        }
    }

    /// Check the server on its own.
    ///
    /// # Errors
    ///
    /// Returns an error if the name or token is empty, or the URL is not an
    /// absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField {
                entity: "ApiServer",
                name: self.api_url.clone(),
                field: "name",
            });
        }
        if self.api_token.is_empty() {
            return Err(ValidationError::EmptyField {
                entity: "ApiServer",
                name: self.name.clone(),
                field: "apiToken",
            });
        }
        let invalid_url = |reason: String| ValidationError::InvalidServerUrl {
            name: self.name.clone(),
            url: self.api_url.clone(),
            reason,
        };
        let parsed = url::Url::parse(&self.api_url).map_err(|e| invalid_url(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid_url(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        if parsed.host_str().is_none() {
            return Err(invalid_url("missing host".to_string()));
        }
        Ok(())
    }
}

impl fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiServer")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("api_url", &self.api_url)
            .field("api_token", &"<redacted>")
            .field("server_id", &self.server_id)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for ApiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
#[path = "model_tests.rs"]
mod model_tests;
