// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Global constants for pdnsync.
//!
//! This module contains all numeric and string constants used throughout the codebase.
//! Constants are organized by category for easy maintenance.

// ============================================================================
// DNS Record Constants
// ============================================================================

/// Record type for IPv4 forward records
pub const RECORD_TYPE_A: &str = "A";

/// Record type for IPv6 forward records
pub const RECORD_TYPE_AAAA: &str = "AAAA";

/// Record type for reverse records
pub const RECORD_TYPE_PTR: &str = "PTR";

/// Zone name suffixes that identify reverse (PTR) zones
pub const REVERSE_ZONE_SUFFIXES: [&str; 2] = ["in-addr.arpa.", "ip6.arpa."];

/// Number of trailing labels (arpa suffix plus root) dropped by reverse-style naming
pub const REVERSE_SUFFIX_LABELS: usize = 3;

/// Default TTL for zones that don't configure one (1 hour)
pub const DEFAULT_ZONE_TTL_SECS: u32 = 3600;

/// Minimum length of a zone name, including the trailing dot
pub const MIN_ZONE_NAME_LEN: usize = 3;

/// Default comment token written to, and used to recognize, managed rrsets
pub const DEFAULT_MANAGED_RECORD_COMMENT: &str = "pdnsync";

// ============================================================================
// Job Constants
// ============================================================================

/// Job name for updates triggered by an IP address change
pub const JOB_NAME_ADDRESS: &str = "PowerDNS IP Address update";

/// Job name for updates triggered by an interface or failover group change
pub const JOB_NAME_INTERFACE: &str = "PowerDNS Interface update";

/// Job name for updates triggered by a device or virtual machine change
pub const JOB_NAME_HOST: &str = "PowerDNS Device update";

/// Job name for full zone synchronization
pub const JOB_NAME_SYNC: &str = "PowerDNS zone sync";

/// Default number of concurrent jobs for the local runner
pub const DEFAULT_WORKERS: usize = 4;

/// Finished jobs the local runner keeps for inspection
pub const DEFAULT_JOB_RETENTION_COUNT: usize = 1000;

/// Minutes a finished job is kept before the local runner drops it
pub const DEFAULT_JOB_RETENTION_MINUTES: u32 = 24 * 60;

// ============================================================================
// PowerDNS API Constants
// ============================================================================

/// Header carrying the PowerDNS API key
pub const PDNS_API_KEY_HEADER: &str = "X-API-Key";

/// rrset changetype used to create (replace) records
pub const PDNS_CHANGETYPE_REPLACE: &str = "REPLACE";

/// rrset changetype used to delete records
pub const PDNS_CHANGETYPE_DELETE: &str = "DELETE";

/// Default HTTP request timeout for the PowerDNS client
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Metrics Server Constants
// ============================================================================

/// Port for Prometheus metrics HTTP server
pub const METRICS_SERVER_PORT: u16 = 9108;

/// Path for Prometheus metrics endpoint
pub const METRICS_SERVER_PATH: &str = "/metrics";

/// Path for the liveness endpoint
pub const HEALTH_SERVER_PATH: &str = "/healthz";

/// Bind address for metrics HTTP server
pub const METRICS_SERVER_BIND_ADDRESS: &str = "0.0.0.0";

// ============================================================================
// Runtime Constants
// ============================================================================

/// Number of worker threads for Tokio runtime
pub const TOKIO_WORKER_THREADS: usize = 4;
