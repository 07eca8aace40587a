// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Per-address resolution state.
//!
//! An [`AddressContext`] answers, for one address, which zone its forward
//! record belongs in, what its FQDN is, and which reverse zone holds its PTR.
//! The forward zone and the FQDN are computed at most once; a zone sync calls
//! [`AddressContext::reset`] before moving to the next address.

use crate::canonical::reverse_dns_name;
use crate::config::Settings;
use crate::errors::SyncError;
use crate::inventory::IpAddress;
use crate::model::Zone;
use crate::naming::generate_fqdn;
use crate::record::{DnsRecord, RecordType};
use crate::registry::ZoneRegistry;
use tracing::debug;

/// Resolution state for one address.
pub struct AddressContext<'a> {
    registry: &'a ZoneRegistry,
    settings: &'a Settings,
    address: &'a IpAddress,
    forward_zone: Option<Option<&'a Zone>>,
    fqdn: Option<Option<String>>,
}

impl<'a> AddressContext<'a> {
    /// Create a context for `address`.
    #[must_use]
    pub fn new(registry: &'a ZoneRegistry, settings: &'a Settings, address: &'a IpAddress) -> Self {
        Self {
            registry,
            settings,
            address,
            forward_zone: None,
            fqdn: None,
        }
    }

    /// Switch to another address, discarding everything computed so far.
    pub fn reset(&mut self, address: &'a IpAddress) {
        self.address = address;
        self.forward_zone = None;
        self.fqdn = None;
    }

    /// The address being resolved.
    #[must_use]
    pub fn address(&self) -> &'a IpAddress {
        self.address
    }

    /// Zone the forward record belongs in.
    ///
    /// The first non-empty of the DNS name, the host name and the failover
    /// group name is placed by longest suffix match; when that finds nothing
    /// the matcher chain decides.
    pub fn forward_zone(&mut self) -> Option<&'a Zone> {
        if let Some(zone) = self.forward_zone {
            return zone;
        }
        let by_name = self
            .address
            .zone_hint_name()
            .and_then(|name| self.registry.find_longest_match(name));
        let zone = by_name.or_else(|| self.registry.match_address(self.address).into_iter().next());
        debug!(
            address = %self.address.address,
            zone = zone.map_or("-", |z| z.name.as_str()),
            by_name = by_name.is_some(),
            "Resolved forward zone"
        );
        self.forward_zone = Some(zone);
        zone
    }

    /// Fully qualified forward name, computed once.
    pub fn fqdn(&mut self) -> Option<String> {
        if let Some(fqdn) = &self.fqdn {
            return fqdn.clone();
        }
        let zone = self.forward_zone();
        let fqdn = generate_fqdn(self.address, zone);
        self.fqdn = Some(fqdn.clone());
        fqdn
    }

    /// Zone holding the PTR record, by longest suffix match of the reverse name.
    #[must_use]
    pub fn reverse_zone(&self) -> Option<&'a Zone> {
        self.registry
            .find_longest_match(&reverse_dns_name(self.address.ip()))
    }

    /// TTL for a record of this address in `zone`: the custom field override,
    /// else the zone default.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTtl` if the custom field holds something other than a
    /// positive integer.
    pub fn ttl_for(&self, zone: &Zone) -> Result<u32, SyncError> {
        Ok(self
            .address
            .ttl_override(self.settings.ttl_field())?
            .unwrap_or(zone.default_ttl))
    }

    /// The A or AAAA record for this address.
    ///
    /// # Errors
    ///
    /// Returns `NoZoneFound` when no forward zone applies, `NoNameFound` when
    /// the zone's naming methods produce nothing, or `InvalidTtl`.
    pub fn forward_record(&mut self) -> Result<DnsRecord, SyncError> {
        let zone = self.forward_zone().ok_or_else(|| SyncError::NoZoneFound {
            address: self.address.address.to_string(),
        })?;
        let fqdn = self.fqdn().ok_or_else(|| SyncError::NoNameFound {
            address: self.address.address.to_string(),
            zone: Some(zone.name.clone()),
        })?;
        let ip = self.address.ip();
        Ok(DnsRecord::new(
            &fqdn,
            RecordType::for_ip(ip),
            self.ttl_for(zone)?,
            ip.to_string(),
            &zone.name,
        ))
    }

    /// The PTR record for this address, `None` when no reverse zone applies.
    ///
    /// # Errors
    ///
    /// Returns `NoNameFound` when the address has no forward name, or `InvalidTtl`.
    pub fn reverse_record(&mut self) -> Result<Option<DnsRecord>, SyncError> {
        let fqdn = self.fqdn().ok_or_else(|| SyncError::NoNameFound {
            address: self.address.address.to_string(),
            zone: self.forward_zone.flatten().map(|z| z.name.clone()),
        })?;
        let Some(zone) = self.reverse_zone() else {
            return Ok(None);
        };
        Ok(Some(DnsRecord::new(
            &reverse_dns_name(self.address.ip()),
            RecordType::Ptr,
            self.ttl_for(zone)?,
            fqdn,
            &zone.name,
        )))
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod context_tests;
