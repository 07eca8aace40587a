// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Forward name generation.
//!
//! A zone selects up to three naming methods, one per slot: an IP-derived
//! method, a device-derived method and a failover-group-derived method.
//! [`generate_fqdn`] tries them in that order and keeps the first non-empty
//! name, then qualifies it with the zone.
//!
//! # Example
//!
//! With `naming.device: byInterface` in zone `corp.example.com.`, address
//! `10.0.0.5/24` on interface `GigabitEthernet0/1` of device `Core-SW1`
//! becomes `gigabitethernet0-1.core-sw1.corp.example.com.`.

use crate::canonical::{
    canonicalize, is_within_zone, reverse_dns_name, sanitize_dotted, sanitize_label,
};
use crate::constants::REVERSE_SUFFIX_LABELS;
use crate::inventory::IpAddress;
use crate::model::Zone;
use serde::{Deserialize, Serialize};

/// Every naming strategy pdnsync knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NamingStrategy {
    /// The address's recorded DNS name, verbatim
    IpDnsName,
    /// The reverse lookup name without its `in-addr.arpa.` / `ip6.arpa.` suffix
    IpReverse,
    /// The attached host's name
    DeviceName,
    /// `<interface>.<host>`
    DeviceByInterface,
    /// `<interface>.<host>`, or `<host>` when the address is the host's primary address
    DeviceByInterfaceExceptPrimary,
    /// The failover group's name
    FailoverGroupName,
}

/// Produces a bare (unqualified) name for an address.
pub trait DeriveName {
    /// Returns `None` when the address lacks what the method needs.
    fn derive_name(&self, address: &IpAddress) -> Option<String>;
}

impl DeriveName for NamingStrategy {
    fn derive_name(&self, address: &IpAddress) -> Option<String> {
        let name = match self {
            Self::IpDnsName => address.dns_name.clone(),
            Self::IpReverse => {
                let reverse = reverse_dns_name(address.ip());
                let labels: Vec<&str> = reverse.split('.').collect();
                labels[..labels.len().saturating_sub(REVERSE_SUFFIX_LABELS)].join(".")
            }
            Self::DeviceName => sanitize_dotted(&address.host()?.name),
            Self::DeviceByInterface => interface_qualified(address, false)?,
            Self::DeviceByInterfaceExceptPrimary => interface_qualified(address, true)?,
            Self::FailoverGroupName => sanitize_dotted(&address.failover_group()?.name),
        };
        (!name.is_empty()).then_some(name)
    }
}

/// `<interface>.<host>` for an interface-attached address.
fn interface_qualified(address: &IpAddress, except_primary: bool) -> Option<String> {
    let host = address.host()?;
    let host_name = sanitize_dotted(&host.name);
    if except_primary && host.is_primary(address.ip()) {
        return Some(host_name);
    }
    let label = address
        .interface()
        .map(|interface| sanitize_label(&interface.name))
        .unwrap_or_default();
    if label.is_empty() {
        Some(host_name)
    } else if host_name.is_empty() {
        Some(label)
    } else {
        Some(format!("{label}.{host_name}"))
    }
}

/// IP-derived naming methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IpNaming {
    /// Use the recorded DNS name
    DnsName,
    /// Use the reverse lookup name
    Reverse,
}

/// Device-derived naming methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceNaming {
    /// `<host>`
    Name,
    /// `<interface>.<host>`
    ByInterface,
    /// `<interface>.<host>` except for the host's primary addresses
    ByInterfaceExceptPrimary,
}

/// Failover-group-derived naming methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailoverGroupNaming {
    /// `<group>`
    Name,
}

impl From<IpNaming> for NamingStrategy {
    fn from(value: IpNaming) -> Self {
        match value {
            IpNaming::DnsName => Self::IpDnsName,
            IpNaming::Reverse => Self::IpReverse,
        }
    }
}

impl From<DeviceNaming> for NamingStrategy {
    fn from(value: DeviceNaming) -> Self {
        match value {
            DeviceNaming::Name => Self::DeviceName,
            DeviceNaming::ByInterface => Self::DeviceByInterface,
            DeviceNaming::ByInterfaceExceptPrimary => Self::DeviceByInterfaceExceptPrimary,
        }
    }
}

impl From<FailoverGroupNaming> for NamingStrategy {
    fn from(value: FailoverGroupNaming) -> Self {
        match value {
            FailoverGroupNaming::Name => Self::FailoverGroupName,
        }
    }
}

/// Naming methods selected by a zone, one optional method per slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamingMethods {
    /// IP-derived method, tried first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<IpNaming>,
    /// Device-derived method, tried second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceNaming>,
    /// Failover-group-derived method, tried last
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failover_group: Option<FailoverGroupNaming>,
}

impl NamingMethods {
    /// Configured strategies in evaluation order.
    pub fn chain(&self) -> impl Iterator<Item = NamingStrategy> {
        [
            self.ip.map(NamingStrategy::from),
            self.device.map(NamingStrategy::from),
            self.failover_group.map(NamingStrategy::from),
        ]
        .into_iter()
        .flatten()
    }

    /// Returns true if no slot is configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ip.is_none() && self.device.is_none() && self.failover_group.is_none()
    }
}

/// Generate the fully qualified forward name of `address` in `zone`.
///
/// Returns `None` when no zone is given or none of the zone's naming methods
/// produces a name.
#[must_use]
pub fn generate_fqdn(address: &IpAddress, zone: Option<&Zone>) -> Option<String> {
    let zone = zone?;
    let name = zone
        .naming
        .chain()
        .find_map(|strategy| strategy.derive_name(address))?;
    Some(qualify(&name, &zone.name))
}

/// Canonicalize `name` and append `zone_name` unless it is already inside it.
#[must_use]
pub fn qualify(name: &str, zone_name: &str) -> String {
    let name = canonicalize(name);
    if is_within_zone(&name, zone_name) {
        name
    } else {
        format!("{name}{}", canonicalize(zone_name))
    }
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod naming_tests;
