// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Name canonicalization helpers.
//!
//! Pure string functions shared by the zone registry, the naming chain and the
//! record model. None of them allocate more than one output string and none of
//! them can fail.

use crate::constants::REVERSE_ZONE_SUFFIXES;
use regex::Regex;
use std::net::IpAddr;
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Characters that survive label sanitization before separators are collapsed.
static DISALLOWED_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s\-/._]").expect("static regex is valid"));

/// Runs of separators that collapse into a single hyphen.
static SEPARATOR_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[_./\-\s]+").expect("static regex is valid"));

/// Ensure `name` ends with a dot.
///
/// # Examples
///
/// ```rust
/// use pdnsync::canonical::canonicalize;
///
/// assert_eq!(canonicalize("example.com"), "example.com.");
/// assert_eq!(canonicalize("example.com."), "example.com.");
/// ```
#[must_use]
pub fn canonicalize(name: &str) -> String {
    if name.ends_with('.') {
        name.to_string()
    } else {
        format!("{name}.")
    }
}

/// Turn an arbitrary inventory name into a single DNS label.
///
/// The input is NFKD-normalized and reduced to ASCII, lower-cased, stripped of
/// anything that is not alphanumeric, underscore, hyphen, slash, dot or
/// whitespace, and then every run of `_ . / -` or whitespace becomes one hyphen.
/// Leading and trailing hyphens and underscores are trimmed.
///
/// # Examples
///
/// ```rust
/// use pdnsync::canonical::sanitize_label;
///
/// assert_eq!(sanitize_label("GigabitEthernet0/1"), "gigabitethernet0-1");
/// assert_eq!(sanitize_label("  Core Switch  "), "core-switch");
/// assert_eq!(sanitize_label("Zürich"), "zurich");
/// ```
#[must_use]
pub fn sanitize_label(label: &str) -> String {
    let ascii: String = label
        .nfkd()
        .filter(char::is_ascii)
        .collect::<String>()
        .to_ascii_lowercase();
    let stripped = DISALLOWED_CHARS.replace_all(&ascii, "");
    let collapsed = SEPARATOR_RUNS.replace_all(&stripped, "-");
    collapsed.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Sanitize every dot-separated label of `name` and join them back with dots.
///
/// Empty labels produced by sanitization are dropped so the result never
/// contains `..`.
#[must_use]
pub fn sanitize_dotted(name: &str) -> String {
    name.split('.')
        .map(sanitize_label)
        .filter(|label| !label.is_empty())
        .collect::<Vec<_>>()
        .join(".")
}

/// Returns true if `name` is a reverse (PTR) zone or lives inside one.
#[must_use]
pub fn is_reverse_zone(name: &str) -> bool {
    let name = canonicalize(name);
    REVERSE_ZONE_SUFFIXES
        .iter()
        .any(|suffix| name.ends_with(suffix))
}

/// Build the canonical reverse lookup name for an address.
///
/// IPv4 addresses produce `d.c.b.a.in-addr.arpa.`, IPv6 addresses the nibble
/// format under `ip6.arpa.`.
#[must_use]
pub fn reverse_dns_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa.")
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(73);
            for byte in v6.octets().iter().rev() {
                name.push_str(&format!("{:x}.{:x}.", byte & 0x0f, byte >> 4));
            }
            name.push_str("ip6.arpa.");
            name
        }
    }
}

/// Returns true if `name` equals `zone` or sits below it on a label boundary.
///
/// Both names are canonicalized first, so `host.example.com` is inside
/// `example.com.`, while `myexample.com.` is not.
#[must_use]
pub fn is_within_zone(name: &str, zone: &str) -> bool {
    let name = canonicalize(name);
    let zone = canonicalize(zone);
    name == zone
        || name
            .strip_suffix(zone.as_str())
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Strip the zone suffix and trailing dots from a fully qualified name.
///
/// Only a suffix is removed; a zone name that happens to occur earlier in the
/// name is left alone. The zone apex yields an empty string.
#[must_use]
pub fn relative_name(fqdn: &str, zone_name: &str) -> String {
    fqdn.strip_suffix(zone_name)
        .unwrap_or(fqdn)
        .trim_end_matches('.')
        .to_string()
}

#[cfg(test)]
#[path = "canonical_tests.rs"]
mod canonical_tests;
