// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Inventory data model and the read-only store contract.
//!
//! pdnsync never owns inventory data. It reads addresses, the interface,
//! device, virtual machine or failover group they are attached to, and the
//! tags and roles used by zone matchers through the [`Inventory`] trait.
//!
//! [`MemoryInventory`] is a snapshot-backed implementation used by the CLI and
//! the test-suite.
//!
//! # Example snapshot
//!
//! ```yaml
//! addresses:
//!   - id: 1
//!     address: 10.0.0.5/24
//!     dnsName: host1
//!     tags: [dns]
//!     attachment:
//!       kind: interface
//!       interface: { id: 10, name: eth0, mgmtOnly: false }
//!       host: { id: 100, kind: device, name: sw1, deviceRole: access }
//! ```

use crate::errors::SyncError;
use anyhow::Context;
use async_trait::async_trait;
use ipnetwork::IpNetwork;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;
use std::path::Path;
use std::sync::{PoisonError, RwLock};

/// Inventory identifier of an IP address.
pub type AddressId = u64;

/// An IP address as recorded by the inventory.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IpAddress {
    /// Inventory identifier
    pub id: AddressId,

    /// Address with prefix length (e.g. `10.0.0.5/24`)
    pub address: IpNetwork,

    /// Recorded DNS name, empty when unset
    #[serde(default)]
    pub dns_name: String,

    /// Tags assigned to the address
    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// Custom field values keyed by field name
    #[serde(default)]
    pub custom_fields: BTreeMap<String, serde_json::Value>,

    /// What the address is assigned to
    #[serde(default)]
    pub attachment: Attachment,
}

/// What an address is assigned to.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Attachment {
    /// Not assigned
    #[default]
    None,
    /// Assigned to a device interface or a virtual machine interface
    Interface(InterfaceAttachment),
    /// Assigned to a failover (FHRP) group
    FailoverGroup(FailoverGroup),
}

/// An interface together with the host owning it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceAttachment {
    /// The interface the address is configured on
    pub interface: Interface,
    /// Device or virtual machine owning the interface
    pub host: Host,
}

/// Device interface or VM interface.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Interface {
    /// Inventory identifier
    pub id: u64,
    /// Interface name as recorded (e.g. `GigabitEthernet0/1`)
    pub name: String,
    /// Tags assigned to the interface
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Out-of-band management interface; always false for VM interfaces
    #[serde(default)]
    pub mgmt_only: bool,
}

/// Kind of host an interface belongs to.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum HostKind {
    /// Physical device
    #[default]
    Device,
    /// Virtual machine
    VirtualMachine,
}

/// Device or virtual machine.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    /// Inventory identifier
    pub id: u64,
    /// Device or virtual machine
    #[serde(default)]
    pub kind: HostKind,
    /// Host name as recorded
    pub name: String,
    /// Tags assigned to the host
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Device-specific role
    #[serde(default)]
    pub device_role: Option<String>,
    /// Generic role
    #[serde(default)]
    pub role: Option<String>,
    /// Primary IPv4 address of the host
    #[serde(default)]
    pub primary_ip4: Option<IpAddr>,
    /// Primary IPv6 address of the host
    #[serde(default)]
    pub primary_ip6: Option<IpAddr>,
}

impl Host {
    /// Role used by zone role matchers: the device role, falling back to the generic role.
    #[must_use]
    pub fn role_name(&self) -> Option<&str> {
        self.device_role.as_deref().or(self.role.as_deref())
    }

    /// Returns true if `ip` is one of the host's primary addresses.
    #[must_use]
    pub fn is_primary(&self, ip: IpAddr) -> bool {
        self.primary_ip4 == Some(ip) || self.primary_ip6 == Some(ip)
    }
}

/// First-hop redundancy group (VRRP, HSRP, ...).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FailoverGroup {
    /// Inventory identifier
    pub id: u64,
    /// Group name
    pub name: String,
    /// Tags assigned to the group
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl IpAddress {
    /// The bare address, without prefix length.
    #[must_use]
    pub fn ip(&self) -> IpAddr {
        self.address.ip()
    }

    /// Address family, 4 or 6.
    #[must_use]
    pub fn family(&self) -> u8 {
        match self.address {
            IpNetwork::V4(_) => 4,
            IpNetwork::V6(_) => 6,
        }
    }

    /// Interface the address is configured on, if any.
    #[must_use]
    pub fn interface(&self) -> Option<&Interface> {
        match &self.attachment {
            Attachment::Interface(attached) => Some(&attached.interface),
            _ => None,
        }
    }

    /// Device or virtual machine owning the address's interface, if any.
    #[must_use]
    pub fn host(&self) -> Option<&Host> {
        match &self.attachment {
            Attachment::Interface(attached) => Some(&attached.host),
            _ => None,
        }
    }

    /// Failover group the address belongs to, if any.
    #[must_use]
    pub fn failover_group(&self) -> Option<&FailoverGroup> {
        match &self.attachment {
            Attachment::FailoverGroup(group) => Some(group),
            _ => None,
        }
    }

    /// Returns true if the address sits on a management-only device interface.
    #[must_use]
    pub fn on_mgmt_interface(&self) -> bool {
        match &self.attachment {
            Attachment::Interface(attached) => {
                attached.host.kind == HostKind::Device && attached.interface.mgmt_only
            }
            _ => false,
        }
    }

    /// First non-empty name an address can be placed in a zone by: its DNS
    /// name, then its host's name, then its failover group's name.
    #[must_use]
    pub fn zone_hint_name(&self) -> Option<&str> {
        if !self.dns_name.is_empty() {
            return Some(&self.dns_name);
        }
        let name = match &self.attachment {
            Attachment::Interface(attached) => attached.host.name.as_str(),
            Attachment::FailoverGroup(group) => group.name.as_str(),
            Attachment::None => "",
        };
        (!name.is_empty()).then_some(name)
    }

    /// TTL override read from the custom field named `field`.
    ///
    /// Unset, null, zero and empty values mean "no override".
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidTtl`] if the field holds anything but a
    /// positive integer.
    pub fn ttl_override(&self, field: Option<&str>) -> Result<Option<u32>, SyncError> {
        let Some(field) = field else {
            return Ok(None);
        };
        let Some(value) = self.custom_fields.get(field) else {
            return Ok(None);
        };
        let invalid = || SyncError::InvalidTtl {
            field: field.to_string(),
            value: value.to_string(),
        };
        match value {
            serde_json::Value::Null | serde_json::Value::Bool(false) => Ok(None),
            serde_json::Value::String(s) if s.is_empty() => Ok(None),
            serde_json::Value::Number(n) => match n.as_u64() {
                Some(0) => Ok(None),
                Some(ttl) => u32::try_from(ttl).map(Some).map_err(|_| invalid()),
                None => Err(invalid()),
            },
            _ => Err(invalid()),
        }
    }
}

/// Read-only queries pdnsync needs from the inventory.
#[async_trait]
pub trait Inventory: Send + Sync {
    /// Fetch one address, `None` if it no longer exists.
    async fn get_address(&self, id: AddressId) -> Result<Option<IpAddress>, SyncError>;

    /// Every address in the inventory.
    async fn addresses(&self) -> Result<Vec<IpAddress>, SyncError>;
}

/// Inventory snapshot file layout.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    /// All addresses with their attachments inlined
    #[serde(default)]
    pub addresses: Vec<IpAddress>,
}

/// Inventory held in memory, keyed by address id.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    addresses: RwLock<BTreeMap<AddressId, IpAddress>>,
}

impl MemoryInventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an inventory holding `addresses`.
    #[must_use]
    pub fn from_addresses(addresses: impl IntoIterator<Item = IpAddress>) -> Self {
        let inventory = Self::new();
        for address in addresses {
            inventory.upsert(address);
        }
        inventory
    }

    /// Load a YAML snapshot from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory snapshot {}", path.display()))?;
        let snapshot: InventorySnapshot = serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse inventory snapshot {}", path.display()))?;
        Ok(Self::from_addresses(snapshot.addresses))
    }

    /// Insert or replace an address.
    pub fn upsert(&self, address: IpAddress) {
        let mut addresses = self
            .addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        addresses.insert(address.id, address);
    }

    /// Remove an address, returning it if it existed.
    pub fn remove(&self, id: AddressId) -> Option<IpAddress> {
        let mut addresses = self
            .addresses
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        addresses.remove(&id)
    }
}

#[async_trait]
impl Inventory for MemoryInventory {
    async fn get_address(&self, id: AddressId) -> Result<Option<IpAddress>, SyncError> {
        let addresses = self
            .addresses
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(addresses.get(&id).cloned())
    }

    async fn addresses(&self) -> Result<Vec<IpAddress>, SyncError> {
        let addresses = self
            .addresses
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(addresses.values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "inventory_tests.rs"]
mod inventory_tests;
