// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Zone-relative DNS records and their conversion to and from PowerDNS rrsets.
//!
//! A [`DnsRecord`] is a value: two records are the same record when name,
//! type, TTL, data and zone all match. A record whose TTL changed is a
//! different record, so the diff deletes the old one and creates the new one.
//!
//! PowerDNS writes whole rrsets, not records. Every write is an
//! [`RRSetChange`] carrying all the records one owner name and type should
//! hold afterwards, so records sharing a name never overwrite each other.

use crate::canonical::{canonicalize, relative_name};
use crate::constants::{
    PDNS_CHANGETYPE_DELETE, PDNS_CHANGETYPE_REPLACE, RECORD_TYPE_A, RECORD_TYPE_AAAA,
    RECORD_TYPE_PTR,
};
use crate::powerdns::types::{Comment, RRSet, RecordContent};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// Record types pdnsync manages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RecordType {
    /// IPv4 address
    A,
    /// IPv6 address
    Aaaa,
    /// Reverse pointer
    Ptr,
}

impl RecordType {
    /// Forward record type for an address family.
    #[must_use]
    pub fn for_ip(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::A,
            IpAddr::V6(_) => Self::Aaaa,
        }
    }

    /// Presentation form (`A`, `AAAA`, `PTR`).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A => RECORD_TYPE_A,
            Self::Aaaa => RECORD_TYPE_AAAA,
            Self::Ptr => RECORD_TYPE_PTR,
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            RECORD_TYPE_A => Ok(Self::A),
            RECORD_TYPE_AAAA => Ok(Self::Aaaa),
            RECORD_TYPE_PTR => Ok(Self::Ptr),
            other => Err(format!("unmanaged record type {other}")),
        }
    }
}

/// A single record, named relative to its zone.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Owner name relative to the zone; empty for the apex
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Time to live in seconds
    pub ttl: u32,
    /// Record data (address for A/AAAA, target FQDN for PTR)
    pub data: String,
    /// Canonical zone name
    pub zone: String,
}

impl DnsRecord {
    /// Build a record from a fully qualified owner name.
    #[must_use]
    pub fn new(
        fqdn: &str,
        record_type: RecordType,
        ttl: u32,
        data: impl Into<String>,
        zone: &str,
    ) -> Self {
        let zone = canonicalize(zone);
        Self {
            name: relative_name(&canonicalize(fqdn), &zone),
            record_type,
            ttl,
            data: data.into(),
            zone,
        }
    }

    /// Fully qualified owner name.
    #[must_use]
    pub fn fqdn(&self) -> String {
        self.key().fqdn()
    }

    /// Records pdnsync may manage in a live rrset.
    ///
    /// Returns nothing for unmanaged types, and, when `managed_comment` is set,
    /// for rrsets that do not carry that exact comment.
    #[must_use]
    pub fn from_rrset(rrset: &RRSet, zone: &str, managed_comment: Option<&str>) -> Vec<Self> {
        if !can_manage(rrset, managed_comment) {
            return Vec::new();
        }
        let Ok(record_type) = rrset.rtype.parse::<RecordType>() else {
            return Vec::new();
        };
        rrset
            .records
            .iter()
            .map(|content| Self::new(&rrset.name, record_type, rrset.ttl, &content.content, zone))
            .collect()
    }

    /// The rrset this record belongs to.
    #[must_use]
    pub fn key(&self) -> RRSetKey {
        RRSetKey {
            name: self.name.clone(),
            record_type: self.record_type,
            zone: self.zone.clone(),
        }
    }
}

impl fmt::Display for DnsRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {}",
            self.fqdn(),
            self.record_type,
            self.ttl,
            self.data
        )
    }
}

/// Returns true if pdnsync owns `rrset`: a managed type and, when a managed
/// comment is configured, that comment among the rrset's comments.
#[must_use]
pub fn can_manage(rrset: &RRSet, managed_comment: Option<&str>) -> bool {
    if rrset.rtype.parse::<RecordType>().is_err() {
        return false;
    }
    match managed_comment.filter(|c| !c.is_empty()) {
        Some(token) => rrset.comments.iter().any(|c| c.content == token),
        None => true,
    }
}

/// Owner name, type and zone shared by the records of one rrset.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RRSetKey {
    /// Owner name relative to the zone; empty for the apex
    pub name: String,
    /// Record type
    pub record_type: RecordType,
    /// Canonical zone name
    pub zone: String,
}

impl RRSetKey {
    /// Fully qualified owner name.
    #[must_use]
    pub fn fqdn(&self) -> String {
        if self.name.is_empty() {
            self.zone.clone()
        } else {
            format!("{}.{}", self.name, self.zone)
        }
    }
}

impl fmt::Display for RRSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fqdn(), self.record_type)
    }
}

/// The full content one rrset should hold after a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RRSetChange {
    /// Rrset being written
    pub key: RRSetKey,
    /// Every record the rrset holds afterwards; empty removes the rrset
    pub records: Vec<DnsRecord>,
}

impl RRSetChange {
    /// Returns true if the write removes the rrset.
    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.records.is_empty()
    }

    /// Rrset for a PATCH request: `REPLACE` with every record, or `DELETE`.
    ///
    /// PowerDNS keeps one TTL per rrset; the lowest TTL among the records wins.
    #[must_use]
    pub fn to_rrset(&self, managed_comment: Option<&str>) -> RRSet {
        let changetype = if self.is_delete() {
            PDNS_CHANGETYPE_DELETE
        } else {
            PDNS_CHANGETYPE_REPLACE
        };
        RRSet {
            name: self.key.fqdn(),
            rtype: self.key.record_type.to_string(),
            ttl: self.records.iter().map(|r| r.ttl).min().unwrap_or_default(),
            changetype: Some(changetype.to_string()),
            records: self
                .records
                .iter()
                .map(|r| RecordContent {
                    content: r.data.clone(),
                    disabled: false,
                })
                .collect(),
            comments: managed_comment
                .filter(|c| !c.is_empty() && !self.is_delete())
                .map(Comment::new)
                .into_iter()
                .collect(),
        }
    }
}

/// Records grouped by the rrset they belong to.
#[must_use]
pub fn group_by_rrset<'a>(
    records: impl IntoIterator<Item = &'a DnsRecord>,
) -> BTreeMap<RRSetKey, Vec<DnsRecord>> {
    let mut groups: BTreeMap<RRSetKey, Vec<DnsRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.key()).or_default().push(record.clone());
    }
    groups
}

/// Give every record of an rrset the lowest TTL found in it.
///
/// A live rrset has a single TTL, so desired records must agree on one
/// before they are compared with what PowerDNS serves.
#[must_use]
pub fn unify_ttls(records: &BTreeSet<DnsRecord>) -> BTreeSet<DnsRecord> {
    group_by_rrset(records)
        .into_values()
        .flat_map(|group| {
            let ttl = group.iter().map(|r| r.ttl).min().unwrap_or_default();
            group.into_iter().map(move |r| DnsRecord { ttl, ..r })
        })
        .collect()
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod record_tests;
