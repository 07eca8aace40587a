// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

#![allow(unexpected_cfgs)]

//! # pdnsync - PowerDNS synchronization for a network inventory
//!
//! pdnsync keeps the forward (A/AAAA) and reverse (PTR) records of PowerDNS
//! zones consistent with the IP addresses recorded in a network inventory.
//!
//! ## Overview
//!
//! Zones are configured with matchers (tags, roles, a default zone) and an
//! ordered list of naming methods. For every inventory address pdnsync:
//!
//! - Places the address in a forward zone and a reverse zone
//! - Derives its fully qualified name from the zone's naming methods
//! - Pushes the resulting records to every PowerDNS API server of the zone
//!
//! Two tasks do the work: a single-address update, queued when the inventory
//! reports a relevant change, and a full zone sync, run on demand or on a
//! recurring schedule, which also deletes records nothing asks for anymore.
//!
//! ## Modules
//!
//! - [`config`] - YAML configuration and engine settings
//! - [`model`] / [`registry`] - Zones, API servers and zone lookup
//! - [`inventory`] - Inventory data model and store contract
//! - [`naming`] - Naming strategies producing forward names
//! - [`record`] - Zone-relative records and rrset conversion
//! - [`powerdns`] - PowerDNS HTTP API client
//! - [`reconcilers`] - The update and sync tasks
//! - [`jobs`] / [`runner`] - Job records, the job queue and its local runner
//! - [`triggers`] - Change notifications that queue update jobs
//! - [`metrics`] - Prometheus metrics
//!
//! ## Example
//!
//! ```rust,no_run
//! use pdnsync::config::Config;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::load(std::path::Path::new("pdnsync.yaml"))?;
//! let registry = config.build_registry()?;
//! for zone in registry.zones() {
//!     println!("{zone}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod config;
pub mod constants;
pub mod errors;
pub mod inventory;
pub mod jobs;
pub mod metrics;
pub mod model;
pub mod naming;
pub mod powerdns;
pub mod reconcilers;
pub mod record;
pub mod registry;
pub mod runner;
pub mod triggers;
