// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone registry: the set of configured zones and API servers, and the two
//! zone lookups everything else is built on.
//!
//! - [`ZoneRegistry::find_longest_match`] places a name in the most specific
//!   enabled zone containing it.
//! - [`ZoneRegistry::match_address`] walks the matcher precedence chain for an
//!   address that has no usable name.
//!
//! Zones and servers are kept in name order, so every lookup result is
//! deterministic.

use crate::canonical::{canonicalize, is_within_zone};
use crate::errors::ValidationError;
use crate::inventory::{Attachment, IpAddress};
use crate::model::{intersects, ApiServer, Zone};
use std::collections::BTreeMap;
use tracing::debug;

/// Validated zones and API servers, keyed by name.
#[derive(Clone, Debug, Default)]
pub struct ZoneRegistry {
    zones: BTreeMap<String, Zone>,
    servers: BTreeMap<String, ApiServer>,
}

impl ZoneRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an API server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is invalid, or its name or URL is
    /// already registered.
    pub fn add_server(&mut self, server: ApiServer) -> Result<(), ValidationError> {
        server.validate()?;
        if self.servers.contains_key(&server.name) {
            return Err(ValidationError::DuplicateServerName { name: server.name });
        }
        if let Some(existing) = self.servers.values().find(|s| s.api_url == server.api_url) {
            return Err(ValidationError::DuplicateServerUrl {
                url: server.api_url,
                existing: existing.name.clone(),
            });
        }
        self.servers.insert(server.name.clone(), server);
        Ok(())
    }

    /// Register a zone.
    ///
    /// # Errors
    ///
    /// Returns an error if the zone is invalid, its name is taken, it is a
    /// second default zone, or it references an unknown API server.
    pub fn add_zone(&mut self, zone: Zone) -> Result<(), ValidationError> {
        zone.validate()?;
        if self.zones.contains_key(&zone.name) {
            return Err(ValidationError::DuplicateZone { zone: zone.name });
        }
        if zone.is_default {
            if let Some(existing) = self.zones.values().find(|z| z.is_default) {
                return Err(ValidationError::DuplicateDefault {
                    zone: zone.name,
                    existing: existing.name.clone(),
                });
            }
        }
        if let Some(server) = zone
            .api_servers
            .iter()
            .find(|name| !self.servers.contains_key(*name))
        {
            return Err(ValidationError::UnknownServer {
                zone: zone.name.clone(),
                server: server.clone(),
            });
        }
        self.zones.insert(zone.name.clone(), zone);
        Ok(())
    }

    /// Unregister a zone, returning it if it existed.
    pub fn remove_zone(&mut self, name: &str) -> Option<Zone> {
        self.zones.remove(&canonicalize(name))
    }

    /// Look up a zone by name (trailing dot optional).
    #[must_use]
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(&canonicalize(name))
    }

    /// Look up an API server by name.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&ApiServer> {
        self.servers.get(name)
    }

    /// All zones in name order.
    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    /// All API servers in name order.
    pub fn servers(&self) -> impl Iterator<Item = &ApiServer> {
        self.servers.values()
    }

    /// Zones that are not reverse zones.
    pub fn forward_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values().filter(|z| !z.is_reverse())
    }

    /// `in-addr.arpa.` and `ip6.arpa.` zones.
    pub fn reverse_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values().filter(|z| z.is_reverse())
    }

    /// Enabled API servers bound to `zone`, in the zone's configured order.
    #[must_use]
    pub fn enabled_servers_for_zone(&self, zone: &Zone) -> Vec<&ApiServer> {
        zone.api_servers
            .iter()
            .filter_map(|name| self.servers.get(name))
            .filter(|server| server.enabled)
            .collect()
    }

    fn enabled_zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values().filter(|z| z.enabled)
    }

    /// One level of the precedence chain.
    fn match_level(&self, address: &IpAddress, pick: &dyn Fn(&Zone) -> bool) -> Vec<&Zone> {
        let zones: Vec<&Zone> = self.enabled_zones().filter(|z| pick(z)).collect();
        filter_mgmt_only(zones, address)
    }

    /// The most specific enabled zone containing `name`.
    #[must_use]
    pub fn find_longest_match(&self, name: &str) -> Option<&Zone> {
        let name = canonicalize(name);
        let mut best: Option<&Zone> = None;
        for zone in self.enabled_zones() {
            if is_within_zone(&name, &zone.name)
                && best.is_none_or(|b| zone.name.len() > b.name.len())
            {
                best = Some(zone);
            }
        }
        best
    }

    /// Enabled zones selected by the matcher precedence chain, in name order.
    ///
    /// Levels are tried in order and the first level that yields zones wins:
    /// address tags, then interface tags or host tags for interface-attached
    /// addresses, then failover group tags, then the host role, then the
    /// default zone.
    #[must_use]
    pub fn match_address(&self, address: &IpAddress) -> Vec<&Zone> {
        let level = |pick: &dyn Fn(&Zone) -> bool| self.match_level(address, pick);

        let zones = level(&|z| intersects(&z.matchers.address_tags, &address.tags));
        if !zones.is_empty() {
            debug!(address = %address.address, "zones matched by address tags");
            return zones;
        }

        match &address.attachment {
            Attachment::Interface(attached) => {
                let zones =
                    level(&|z| intersects(&z.matchers.interface_tags, &attached.interface.tags));
                if !zones.is_empty() {
                    debug!(address = %address.address, "zones matched by interface tags");
                    return zones;
                }
                let zones = level(&|z| intersects(&z.matchers.device_tags, &attached.host.tags));
                if !zones.is_empty() {
                    debug!(address = %address.address, "zones matched by host tags");
                    return zones;
                }
            }
            Attachment::FailoverGroup(group) => {
                let zones = level(&|z| intersects(&z.matchers.failover_group_tags, &group.tags));
                if !zones.is_empty() {
                    debug!(address = %address.address, "zones matched by failover group tags");
                    return zones;
                }
            }
            Attachment::None => {}
        }

        if let Some(role) = address.host().and_then(|h| h.role_name()) {
            let zones = level(&|z| z.matchers.device_roles.contains(role));
            if !zones.is_empty() {
                debug!(address = %address.address, role, "zones matched by role");
                return zones;
            }
        }

        level(&|z| z.is_default)
    }
}

/// Narrow `zones` to management-only zones when any candidate is
/// management-only and the address sits on a management-only interface.
fn filter_mgmt_only<'a>(zones: Vec<&'a Zone>, address: &IpAddress) -> Vec<&'a Zone> {
    if zones.iter().any(|z| z.matchers.mgmt_only) && address.on_mgmt_interface() {
        zones.into_iter().filter(|z| z.matchers.mgmt_only).collect()
    } else {
        zones
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod registry_tests;
