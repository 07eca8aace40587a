// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `model.rs`

use super::*;
use crate::naming::{DeviceNaming, IpNaming};

fn forward_zone(name: &str) -> Zone {
    let mut zone = Zone::new(name);
    zone.naming.ip = Some(IpNaming::DnsName);
    zone
}

fn address(yaml: &str) -> IpAddress {
    serde_yaml::from_str(yaml).unwrap()
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(ToString::to_string).collect()
}

#[test]
fn test_forward_zone_is_valid() {
    assert!(forward_zone("corp.example.com.").validate().is_ok());
}

#[test]
fn test_zone_name_must_end_with_dot() {
    let err = forward_zone("corp.example.com").validate().unwrap_err();
    assert!(matches!(err, ValidationError::InvalidZoneName { .. }));
}

#[test]
fn test_zone_name_too_short() {
    let err = forward_zone("a.").validate().unwrap_err();
    assert!(matches!(err, ValidationError::InvalidZoneName { .. }));
}

#[test]
fn test_zone_name_rejects_bad_labels() {
    for name in ["-bad.example.", "under_score.example.", "a..b.", "sp ace.example."] {
        let err = forward_zone(name).validate().unwrap_err();
        assert!(
            matches!(err, ValidationError::InvalidZoneName { .. }),
            "name: {name}"
        );
    }
}

#[test]
fn test_zone_label_length_limit() {
    let longest = format!("{}.example.com.", "a".repeat(63));
    assert!(forward_zone(&longest).validate().is_ok());

    let too_long = format!("{}.example.com.", "a".repeat(64));
    let err = forward_zone(&too_long).validate().unwrap_err();
    assert!(matches!(err, ValidationError::InvalidZoneName { .. }));
}

#[test]
fn test_empty_zone_name() {
    let err = forward_zone("").validate().unwrap_err();
    assert!(matches!(err, ValidationError::EmptyField { field: "name", .. }));
}

#[test]
fn test_forward_zone_needs_naming_method() {
    let zone = Zone::new("corp.example.com.");
    assert_eq!(
        zone.validate().unwrap_err(),
        ValidationError::NoNamingMethod {
            zone: "corp.example.com.".to_string()
        }
    );
}

#[test]
fn test_reverse_zone_is_valid_without_naming() {
    let zone = Zone::new("0.0.10.in-addr.arpa.");
    assert!(zone.is_reverse());
    assert!(zone.validate().is_ok());
}

#[test]
fn test_reverse_zone_cannot_be_default() {
    let mut zone = Zone::new("0.0.10.in-addr.arpa.");
    zone.is_default = true;
    assert!(matches!(
        zone.validate().unwrap_err(),
        ValidationError::ReverseZoneDefault { .. }
    ));
}

#[test]
fn test_reverse_zone_rejects_matchers_and_naming() {
    let mut zone = Zone::new("8.b.d.0.1.0.0.2.ip6.arpa.");
    zone.matchers.device_roles = tags(&["access"]);
    assert_eq!(
        zone.validate().unwrap_err(),
        ValidationError::ReverseZoneField {
            zone: "8.b.d.0.1.0.0.2.ip6.arpa.".to_string(),
            field: "matchers.deviceRoles",
        }
    );

    let mut zone = Zone::new("8.b.d.0.1.0.0.2.ip6.arpa.");
    zone.naming.device = Some(DeviceNaming::Name);
    assert_eq!(
        zone.validate().unwrap_err(),
        ValidationError::ReverseZoneField {
            zone: "8.b.d.0.1.0.0.2.ip6.arpa.".to_string(),
            field: "naming.device",
        }
    );
}

#[test]
fn test_zone_yaml_defaults() {
    let zone: Zone = serde_yaml::from_str(
        r"
name: corp.example.com.
naming:
  ip: dnsName
  device: byInterfaceExceptPrimary
matchers:
  addressTags: [dns]
",
    )
    .unwrap();
    assert!(zone.enabled);
    assert!(!zone.is_default);
    assert_eq!(zone.default_ttl, DEFAULT_ZONE_TTL_SECS);
    assert_eq!(zone.naming.device, Some(DeviceNaming::ByInterfaceExceptPrimary));
    assert_eq!(zone.matchers.address_tags, tags(&["dns"]));
}

#[test]
fn test_selects_address_by_name_suffix() {
    let zone = forward_zone("corp.example.com.");
    let by_dns_name = address("{id: 1, address: 10.0.0.5/24, dnsName: host1.corp.example.com}");
    let by_host = address(
        r"
id: 2
address: 10.0.0.6/24
attachment:
  kind: interface
  interface: { id: 1, name: eth0 }
  host: { id: 1, name: sw1.corp.example.com }
",
    );
    let by_group = address(
        r"
id: 3
address: 10.0.0.1/24
attachment: { kind: failoverGroup, id: 1, name: gw.corp.example.com. }
",
    );
    let elsewhere = address("{id: 4, address: 10.0.0.7/24, dnsName: host1.mycorp.example.com}");

    assert!(zone.selects_address(&by_dns_name));
    assert!(zone.selects_address(&by_host));
    assert!(zone.selects_address(&by_group));
    assert!(!zone.selects_address(&elsewhere));
}

#[test]
fn test_selects_address_by_matchers() {
    let mut zone = forward_zone("corp.example.com.");
    zone.matchers.device_roles = tags(&["access"]);
    let matched = address(
        r"
id: 1
address: 10.0.0.5/24
attachment:
  kind: interface
  interface: { id: 1, name: eth0 }
  host: { id: 1, name: sw1, role: access }
",
    );
    let unmatched = address("{id: 2, address: 10.0.0.6/24, dnsName: host.other.}");

    assert!(zone.selects_address(&matched));
    assert!(!zone.selects_address(&unmatched));
}

#[test]
fn test_selects_address_mgmt_only_zone() {
    let mut zone = forward_zone("oob.example.com.");
    zone.matchers.mgmt_only = true;
    let on_mgmt = address(
        r"
id: 1
address: 10.9.0.5/24
dnsName: sw1.oob.example.com
attachment:
  kind: interface
  interface: { id: 1, name: mgmt0, mgmtOnly: true }
  host: { id: 1, name: sw1 }
",
    );
    let mut off_mgmt = on_mgmt.clone();
    off_mgmt.attachment = crate::inventory::Attachment::None;

    assert!(zone.selects_address(&on_mgmt));
    assert!(!zone.selects_address(&off_mgmt));
}

#[test]
fn test_reverse_zone_selects_addresses_inside_it() {
    let zone = Zone::new("0.10.in-addr.arpa.");
    assert!(zone.selects_address(&address("{id: 1, address: 10.0.3.5/24}")));
    assert!(!zone.selects_address(&address("{id: 2, address: 10.1.3.5/24}")));
}

#[test]
fn test_api_server_validation() {
    assert!(ApiServer::new("pdns1", "http://pdns:8081/api/v1", "secret")
        .validate()
        .is_ok());

    let err = ApiServer::new("pdns1", "pdns:8081", "secret")
        .validate()
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidServerUrl { .. }));

    let err = ApiServer::new("pdns1", "ftp://pdns/api", "secret")
        .validate()
        .unwrap_err();
    assert!(matches!(err, ValidationError::InvalidServerUrl { .. }));

    let err = ApiServer::new("pdns1", "http://pdns:8081/api/v1", "")
        .validate()
        .unwrap_err();
    assert!(matches!(
        err,
        ValidationError::EmptyField {
            field: "apiToken",
            ..
        }
    ));
}

#[test]
fn test_api_server_debug_redacts_token() {
    let server = ApiServer::new("pdns1", "http://pdns:8081/api/v1", "very-secret");
    let rendered = format!("{server:?}");
    assert!(!rendered.contains("very-secret"));
    assert!(rendered.contains("pdns1"));
}
