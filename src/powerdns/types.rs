// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! PowerDNS HTTP API payloads.
//!
//! Only the fields pdnsync reads or writes are modelled; unknown fields in
//! responses are ignored.

use serde::{Deserialize, Serialize};

/// A server entry from `GET /servers`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    /// Server id used in every other path (usually `localhost`)
    pub id: String,
    /// Daemon type (`authoritative`, `recursor`)
    #[serde(default)]
    pub daemon_type: Option<String>,
    /// Daemon version
    #[serde(default)]
    pub version: Option<String>,
}

/// A zone from `GET /servers/{id}/zones/{zone}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PdnsZone {
    /// Zone id (the canonical name, possibly escaped)
    #[serde(default)]
    pub id: String,
    /// Canonical zone name
    pub name: String,
    /// Every rrset in the zone
    #[serde(default)]
    pub rrsets: Vec<RRSet>,
}

/// A resource record set.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RRSet {
    /// Owner name, fully qualified
    pub name: String,
    /// Record type (`A`, `AAAA`, `PTR`, ...)
    #[serde(rename = "type")]
    pub rtype: String,
    /// Time to live in seconds
    #[serde(default)]
    pub ttl: u32,
    /// `REPLACE` or `DELETE` on writes; absent on reads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changetype: Option<String>,
    /// Record contents
    #[serde(default)]
    pub records: Vec<RecordContent>,
    /// rrset comments
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// One record inside an rrset.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordContent {
    /// Record data in presentation format
    pub content: String,
    /// Whether the record is disabled
    #[serde(default)]
    pub disabled: bool,
}

/// rrset comment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    /// Comment text
    pub content: String,
    /// Account the comment belongs to
    #[serde(default)]
    pub account: String,
}

impl Comment {
    /// Comment with an empty account.
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            account: String::new(),
        }
    }
}

/// Body of `PATCH /servers/{id}/zones/{zone}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RRSetPatch {
    /// rrsets to change
    pub rrsets: Vec<RRSet>,
}
